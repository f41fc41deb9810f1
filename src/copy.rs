//! Cycle-safe deep copying of in-memory graphs.
//!
//! Copying mirrors serialization's identity discipline without touching the wire:
//! a [`CopyContext`] maps source allocations to their copies, so aliased objects
//! stay aliased in the copy and cycles terminate. Copiers compose the same way
//! codecs do, with element copiers injected at construction.

use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use fxhash::FxHashMap;

use crate::refs::ObjectIdentity;
use crate::registry::{CodecRegistry, DynValue};
use crate::{CodecError, Result};

/// A deep copier for values of type `T`.
pub trait DeepCopier<T> {
    fn deep_copy(&self, value: &T, context: &mut CopyContext) -> Result<T>;

    /// True when a plain clone of this type is already a deep copy (no interior
    /// mutability and no trackable allocations anywhere inside). Container copiers
    /// use this to clone wholesale instead of walking elements.
    fn is_shallow_copyable(&self) -> bool {
        false
    }
}

/// State for one deep-copy operation: the source-to-copy identity map.
pub struct CopyContext {
    registry: Arc<CodecRegistry>,
    copies: FxHashMap<ObjectIdentity, DynValue>,
}

impl CopyContext {
    pub fn new(registry: Arc<CodecRegistry>) -> CopyContext {
        CopyContext {
            registry,
            copies: FxHashMap::default(),
        }
    }

    /// The copy already made for a source allocation, if any.
    pub fn try_get_copy(&self, identity: ObjectIdentity) -> Option<DynValue> {
        self.copies.get(&identity).cloned()
    }

    /// Records the copy of a source allocation. For cyclic types this must happen
    /// before the contents are copied.
    pub fn record_copy(&mut self, identity: ObjectIdentity, copy: DynValue) {
        self.copies.insert(identity, copy);
    }

    /// Copies a dynamically typed value using the registry's copier for its
    /// runtime type, with identity tracking.
    pub fn copy_any(&mut self, value: &DynValue) -> Result<DynValue> {
        let identity = Rc::as_ptr(value) as *const () as usize;
        if let Some(existing) = self.try_get_copy(identity) {
            return Ok(existing);
        }
        let copier = self.registry.copier_for_runtime((**value).type_id())?;
        let copy = copier.copy_dyn(value, self)?;
        self.record_copy(identity, copy.clone());
        Ok(copy)
    }
}

/// Copier for types whose clone is already a deep copy.
pub struct ShallowCopier<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ShallowCopier<T> {
    pub fn new() -> ShallowCopier<T> {
        ShallowCopier {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ShallowCopier<T> {
    fn default() -> ShallowCopier<T> {
        ShallowCopier::new()
    }
}

impl<T: Clone> DeepCopier<T> for ShallowCopier<T> {
    fn deep_copy(&self, value: &T, _context: &mut CopyContext) -> Result<T> {
        Ok(value.clone())
    }

    fn is_shallow_copyable(&self) -> bool {
        true
    }
}

/// Copier for `Rc<T>` with aliasing preservation.
pub struct RcCopier<T, P> {
    inner: P,
    _marker: PhantomData<fn() -> T>,
}

impl<T, P: DeepCopier<T>> RcCopier<T, P> {
    pub fn new(inner: P) -> RcCopier<T, P> {
        RcCopier {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T: 'static, P: DeepCopier<T>> DeepCopier<Rc<T>> for RcCopier<T, P> {
    fn deep_copy(&self, value: &Rc<T>, context: &mut CopyContext) -> Result<Rc<T>> {
        let identity = Rc::as_ptr(value) as usize;
        if let Some(existing) = context.try_get_copy(identity) {
            return existing
                .downcast::<T>()
                .map_err(|_| CodecError::CopyTypeMismatch);
        }
        // Plain `Rc` contents cannot point back at this allocation, so recording
        // after the contents are copied is sound.
        let copy = Rc::new(self.inner.deep_copy(value.as_ref(), context)?);
        context.record_copy(identity, copy.clone());
        Ok(copy)
    }
}

/// Copier for `Rc<RefCell<T>>`, the cyclic destination.
///
/// The copy is constructed with default contents and recorded before the source's
/// contents are copied, so a cycle through this allocation resolves to the copy
/// under construction; the copied contents are written into the cell afterwards.
pub struct RcRefCellCopier<T, P> {
    inner: P,
    _marker: PhantomData<fn() -> T>,
}

impl<T, P: DeepCopier<T>> RcRefCellCopier<T, P> {
    pub fn new(inner: P) -> RcRefCellCopier<T, P> {
        RcRefCellCopier {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T, P> DeepCopier<Rc<RefCell<T>>> for RcRefCellCopier<T, P>
where
    T: Default + 'static,
    P: DeepCopier<T>,
{
    fn deep_copy(
        &self,
        value: &Rc<RefCell<T>>,
        context: &mut CopyContext,
    ) -> Result<Rc<RefCell<T>>> {
        let identity = Rc::as_ptr(value) as usize;
        if let Some(existing) = context.try_get_copy(identity) {
            return existing
                .downcast::<RefCell<T>>()
                .map_err(|_| CodecError::CopyTypeMismatch);
        }
        let cell = Rc::new(RefCell::new(T::default()));
        context.record_copy(identity, cell.clone());
        let copied = {
            let source = value.borrow();
            self.inner.deep_copy(&source, context)?
        };
        *cell.borrow_mut() = copied;
        Ok(cell)
    }
}

/// Copier for `Vec<T>`, parameterized over the element copier.
pub struct VecCopier<T, P> {
    inner: P,
    _marker: PhantomData<fn() -> T>,
}

impl<T, P: DeepCopier<T>> VecCopier<T, P> {
    pub fn new(inner: P) -> VecCopier<T, P> {
        VecCopier {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T: Clone, P: DeepCopier<T>> DeepCopier<Vec<T>> for VecCopier<T, P> {
    fn deep_copy(&self, value: &Vec<T>, context: &mut CopyContext) -> Result<Vec<T>> {
        if self.inner.is_shallow_copyable() {
            return Ok(value.clone());
        }
        value
            .iter()
            .map(|element| self.inner.deep_copy(element, context))
            .collect()
    }
}

/// Copier for `Option<T>`, parameterized over the inner copier.
pub struct OptionCopier<T, P> {
    inner: P,
    _marker: PhantomData<fn() -> T>,
}

impl<T, P: DeepCopier<T>> OptionCopier<T, P> {
    pub fn new(inner: P) -> OptionCopier<T, P> {
        OptionCopier {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T, P: DeepCopier<T>> DeepCopier<Option<T>> for OptionCopier<T, P> {
    fn deep_copy(&self, value: &Option<T>, context: &mut CopyContext) -> Result<Option<T>> {
        match value {
            None => Ok(None),
            Some(inner) => Ok(Some(self.inner.deep_copy(inner, context)?)),
        }
    }

    fn is_shallow_copyable(&self) -> bool {
        self.inner.is_shallow_copyable()
    }
}

/// Copier for dynamically typed values, dispatching through the registry.
pub struct AnyCopier;

impl DeepCopier<DynValue> for AnyCopier {
    fn deep_copy(&self, value: &DynValue, context: &mut CopyContext) -> Result<DynValue> {
        context.copy_any(value)
    }
}
