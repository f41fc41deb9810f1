//! Reference-tracked codecs for shared and cyclic values.
//!
//! An `Rc` is trackable: the first occurrence of an allocation serializes its
//! contents and every later occurrence collapses to a `Reference` field carrying the
//! id the first occurrence consumed. Cycles additionally need a destination that
//! exists before its payload is parsed, which is what [`RcRefCellCodec`] provides by
//! constructing a default-valued cell and patching it afterwards.
//!
//! Both codecs share their inner codec's type key: boxing is a memory-layout
//! detail, not a wire identity.

use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::codecs::FieldCodec;
use crate::reader::Reader;
use crate::refs::ReferenceEntry;
use crate::types::TypeKey;
use crate::wire::Field;
use crate::writer::Writer;
use crate::{CodecError, Result};

/// Serializer for `Rc<T>` with aliasing preservation.
pub struct RcCodec<T, C> {
    inner: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C: FieldCodec<T>> RcCodec<T, C> {
    pub fn new(inner: C) -> RcCodec<T, C> {
        RcCodec {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T: 'static, C: FieldCodec<T>> FieldCodec<Rc<T>> for RcCodec<T, C> {
    fn type_key(&self) -> &TypeKey {
        self.inner.type_key()
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &Rc<T>,
    ) -> Result<()> {
        let identity = Rc::as_ptr(value) as usize;
        if writer.try_write_reference(field_id_delta, expected, identity) {
            return Ok(());
        }
        // First occurrence: the identity is staged and binds to the slot the inner
        // codec consumes as its first action.
        self.inner
            .write_field(writer, field_id_delta, expected, value.as_ref())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<Rc<T>> {
        let before = reader.current_reference_id();
        let value = Rc::new(self.inner.read_value(reader, field)?);
        // The inner codec consumed the next slot first; record the finished
        // allocation there so later references resolve to it.
        reader.record_reference(before + 1, value.clone());
        Ok(value)
    }

    fn resolve_reference(&self, reader: &mut Reader<'_>, id: u32) -> Result<Rc<T>> {
        match reader.reference_entry(id) {
            None => Err(CodecError::ReferenceNotFound(id)),
            Some(ReferenceEntry::Value(value)) => value
                .downcast::<T>()
                .map_err(|_| CodecError::ReferenceTypeMismatch(id)),
            Some(ReferenceEntry::Unresolved(marker)) => {
                reader.read_deferred(&marker, |r, f| self.read_field(r, f))
            }
        }
    }
}

/// Serializer for `Rc<RefCell<T>>`, the cyclic destination.
///
/// On read, a cell holding `T::default()` is constructed and staged *before* the
/// payload is parsed, so references to this object from inside its own payload
/// resolve to the same allocation; the parsed value is written into the cell
/// afterwards.
pub struct RcRefCellCodec<T, C> {
    inner: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C: FieldCodec<T>> RcRefCellCodec<T, C> {
    pub fn new(inner: C) -> RcRefCellCodec<T, C> {
        RcRefCellCodec {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T, C> FieldCodec<Rc<RefCell<T>>> for RcRefCellCodec<T, C>
where
    T: Default + 'static,
    C: FieldCodec<T>,
{
    fn type_key(&self) -> &TypeKey {
        self.inner.type_key()
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &Rc<RefCell<T>>,
    ) -> Result<()> {
        let identity = Rc::as_ptr(value) as usize;
        if writer.try_write_reference(field_id_delta, expected, identity) {
            return Ok(());
        }
        let contents = value.borrow();
        self.inner
            .write_field(writer, field_id_delta, expected, &*contents)
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<Rc<RefCell<T>>> {
        let cell = Rc::new(RefCell::new(T::default()));
        reader.set_pending_reference(cell.clone());
        let value = self.inner.read_value(reader, field)?;
        *cell.borrow_mut() = value;
        Ok(cell)
    }

    fn resolve_reference(&self, reader: &mut Reader<'_>, id: u32) -> Result<Rc<RefCell<T>>> {
        match reader.reference_entry(id) {
            None => Err(CodecError::ReferenceNotFound(id)),
            Some(ReferenceEntry::Value(value)) => value
                .downcast::<RefCell<T>>()
                .map_err(|_| CodecError::ReferenceTypeMismatch(id)),
            Some(ReferenceEntry::Unresolved(marker)) => {
                reader.read_deferred(&marker, |r, f| self.read_field(r, f))
            }
        }
    }
}
