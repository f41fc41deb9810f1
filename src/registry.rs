//! The codec registry: runtime dispatch over registered types.
//!
//! Statically typed code wires codecs together by hand and never touches the
//! registry. The registry exists for the dynamic edges: fields declared as "any
//! registered type" look up a codec by the value's runtime type on the write side
//! and by the wire's type descriptor on the read side.
//!
//! Lookup is two-stage: an exact match on the type key first, then a scan of the
//! registered specializers, which can claim parameterized keys (such as a `vec<...>`
//! of a registered element type) that were never registered verbatim.

use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use fxhash::FxHashMap;

use crate::codecs::FieldCodec;
use crate::copy::{CopyContext, DeepCopier};
use crate::reader::Reader;
use crate::refs::ReferenceEntry;
use crate::types::TypeKey;
use crate::wire::Field;
use crate::writer::Writer;
use crate::{CodecError, Result};

/// A dynamically typed serializable value.
///
/// `Rc` rather than `Box` so that dynamically dispatched values participate in
/// reference tracking like any other trackable object.
pub type DynValue = Rc<dyn Any>;

/// Object-safe facade over a [`FieldCodec`] for registry dispatch.
pub trait DynCodec: Send + Sync {
    fn type_key(&self) -> &TypeKey;

    fn write_dyn(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &DynValue,
    ) -> Result<()>;

    fn read_dyn(&self, reader: &mut Reader<'_>, field: &Field) -> Result<DynValue>;
}

/// Adapts a statically typed codec for `Rc<T>` to the [`DynCodec`] surface.
struct RegisteredCodec<T, C> {
    inner: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C> DynCodec for RegisteredCodec<T, C>
where
    T: 'static,
    C: FieldCodec<Rc<T>> + Send + Sync,
{
    fn type_key(&self) -> &TypeKey {
        self.inner.type_key()
    }

    fn write_dyn(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &DynValue,
    ) -> Result<()> {
        let value = value.clone().downcast::<T>().map_err(|_| {
            CodecError::UnsupportedShape {
                expected: self.inner.type_key().clone(),
            }
        })?;
        self.inner.write_field(writer, field_id_delta, expected, &value)
    }

    fn read_dyn(&self, reader: &mut Reader<'_>, field: &Field) -> Result<DynValue> {
        Ok(self.inner.read_field(reader, field)?)
    }
}

/// Object-safe facade over a [`DeepCopier`] for registry dispatch.
pub trait DynCopier: Send + Sync {
    fn copy_dyn(&self, value: &DynValue, context: &mut CopyContext) -> Result<DynValue>;
}

struct RegisteredCopier<T, P> {
    inner: P,
    _marker: PhantomData<fn() -> T>,
}

impl<T, P> DynCopier for RegisteredCopier<T, P>
where
    T: 'static,
    P: DeepCopier<Rc<T>> + Send + Sync,
{
    fn copy_dyn(&self, value: &DynValue, context: &mut CopyContext) -> Result<DynValue> {
        let value = value
            .clone()
            .downcast::<T>()
            .map_err(|_| CodecError::CopierNotFoundForValue)?;
        Ok(self.inner.deep_copy(&value, context)?)
    }
}

/// Wraps a statically typed codec for `Rc<T>` into a registry-dispatchable codec.
/// Specializers use this to manufacture codecs for keys they recognize.
pub fn dyn_codec<T, C>(codec: C) -> Arc<dyn DynCodec>
where
    T: 'static,
    C: FieldCodec<Rc<T>> + Send + Sync + 'static,
{
    Arc::new(RegisteredCodec {
        inner: codec,
        _marker: PhantomData::<fn() -> T>,
    })
}

/// A fallback that can manufacture codecs for type keys with no exact registration,
/// typically by recognizing a parameterized base name.
pub trait SpecializableCodec: Send + Sync {
    fn try_specialize(&self, key: &TypeKey) -> Option<Arc<dyn DynCodec>>;
}

/// Immutable table of registered codecs and copiers, shared by all sessions.
#[derive(Default)]
pub struct CodecRegistry {
    by_key: FxHashMap<TypeKey, Arc<dyn DynCodec>>,
    by_runtime: FxHashMap<TypeId, Arc<dyn DynCodec>>,
    specializable: Vec<Arc<dyn SpecializableCodec>>,
    copiers: FxHashMap<TypeId, Arc<dyn DynCopier>>,
}

impl CodecRegistry {
    pub fn builder() -> CodecRegistryBuilder {
        CodecRegistryBuilder {
            registry: CodecRegistry::default(),
        }
    }

    /// Resolves the codec for a wire type descriptor.
    pub fn codec_for_key(&self, key: &TypeKey) -> Result<Arc<dyn DynCodec>> {
        if let Some(codec) = self.by_key.get(key) {
            return Ok(codec.clone());
        }
        for specializer in &self.specializable {
            if let Some(codec) = specializer.try_specialize(key) {
                return Ok(codec);
            }
        }
        Err(CodecError::CodecNotFound(key.clone()))
    }

    /// Resolves the codec for a value's runtime type.
    pub fn codec_for_runtime(&self, type_id: TypeId) -> Result<Arc<dyn DynCodec>> {
        self.by_runtime
            .get(&type_id)
            .cloned()
            .ok_or(CodecError::CodecNotFoundForValue)
    }

    /// Resolves the deep copier for a value's runtime type.
    pub fn copier_for_runtime(&self, type_id: TypeId) -> Result<Arc<dyn DynCopier>> {
        self.copiers
            .get(&type_id)
            .cloned()
            .ok_or(CodecError::CopierNotFoundForValue)
    }
}

/// Builder for [`CodecRegistry`]. Registration happens once at startup; the built
/// registry is immutable.
pub struct CodecRegistryBuilder {
    registry: CodecRegistry,
}

impl CodecRegistryBuilder {
    /// Registers a codec for `Rc<T>` under both its type key and `T`'s runtime id.
    pub fn with_codec<T, C>(mut self, codec: C) -> CodecRegistryBuilder
    where
        T: 'static,
        C: FieldCodec<Rc<T>> + Send + Sync + 'static,
    {
        let key = codec.type_key().clone();
        let codec: Arc<dyn DynCodec> = Arc::new(RegisteredCodec {
            inner: codec,
            _marker: PhantomData::<fn() -> T>,
        });
        self.registry.by_key.insert(key, codec.clone());
        self.registry.by_runtime.insert(TypeId::of::<T>(), codec);
        self
    }

    /// Registers a fallback specializer, consulted in registration order after
    /// exact key lookups fail.
    pub fn with_specializer(
        mut self,
        specializer: impl SpecializableCodec + 'static,
    ) -> CodecRegistryBuilder {
        self.registry.specializable.push(Arc::new(specializer));
        self
    }

    /// Registers a deep copier for `Rc<T>` under `T`'s runtime id.
    pub fn with_copier<T, P>(mut self, copier: P) -> CodecRegistryBuilder
    where
        T: 'static,
        P: DeepCopier<Rc<T>> + Send + Sync + 'static,
    {
        self.registry.copiers.insert(
            TypeId::of::<T>(),
            Arc::new(RegisteredCopier {
                inner: copier,
                _marker: PhantomData::<fn() -> T>,
            }),
        );
        self
    }

    pub fn build(self) -> Arc<CodecRegistry> {
        Arc::new(self.registry)
    }
}

static ANY: TypeKey = TypeKey::from_static("any");

/// Codec for dynamically typed values.
///
/// On write, the codec is chosen by the value's runtime type and the field always
/// carries type information (`expected` is dropped, since no single type is
/// expected). On read, the wire's type descriptor selects the codec.
pub struct AnyCodec;

impl FieldCodec<DynValue> for AnyCodec {
    fn type_key(&self) -> &TypeKey {
        &ANY
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        _expected: Option<&TypeKey>,
        value: &DynValue,
    ) -> Result<()> {
        let registry = writer.session.registry();
        let codec = registry.codec_for_runtime((**value).type_id())?;
        codec.write_dyn(writer, field_id_delta, None, value)
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<DynValue> {
        let key = field.field_type.clone().ok_or(CodecError::TypeMissing)?;
        let registry = reader.session.registry();
        let codec = registry.codec_for_key(&key)?;
        codec.read_dyn(reader, field)
    }

    fn resolve_reference(&self, reader: &mut Reader<'_>, id: u32) -> Result<DynValue> {
        match reader.reference_entry(id) {
            None => Err(CodecError::ReferenceNotFound(id)),
            Some(ReferenceEntry::Value(value)) => Ok(value),
            Some(ReferenceEntry::Unresolved(marker)) => {
                reader.read_deferred(&marker, |r, f| self.read_field(r, f))
            }
        }
    }
}
