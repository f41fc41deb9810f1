//! The composable per-type codec surface.
//!
//! Each codec implements read/write for exactly one type, delegating to other codecs
//! for nested fields. Container codecs are parameterized over element codecs injected
//! at construction; the `Rc` codecs add reference tracking; surrogate codecs convert
//! foreign types to a serializer-owned shape first.

pub mod containers;
pub mod primitives;
pub mod reference;
pub mod surrogate;

use crate::reader::Reader;
use crate::types::TypeKey;
use crate::wire::Field;
use crate::writer::Writer;
use crate::{CodecError, Result};

/// A codec for values of type `T`.
///
/// Implementations must consume exactly one reference-id slot per field occurrence,
/// before reading or writing any payload bytes: value codecs via
/// `mark_value_field`, composites via `reserve_object_slot` /
/// `create_record_placeholder`, and reference-tracked codecs through the staging
/// hooks. Writer/reader id numbering depends on this discipline.
pub trait FieldCodec<T> {
    /// The wire identity of the type this codec serializes.
    fn type_key(&self) -> &TypeKey;

    /// Writes one tagged field holding `value`.
    ///
    /// `expected` is the type the reader will assume from context; when it matches
    /// this codec's key, no type information is emitted.
    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &T,
    ) -> Result<()>;

    /// Reads the value of a field whose header has already been decoded.
    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<T>;

    /// Reads a field, routing `Reference` wire forms to [`resolve_reference`] and
    /// everything else to [`read_value`]. Callers decoding a field of this codec's
    /// type should enter here.
    ///
    /// [`resolve_reference`]: FieldCodec::resolve_reference
    /// [`read_value`]: FieldCodec::read_value
    fn read_field(&self, reader: &mut Reader<'_>, field: &Field) -> Result<T> {
        if field.wire_type()? == crate::wire::WireType::Reference {
            reader.mark_value_field();
            let id = reader.read_varuint32()?;
            return self.resolve_reference(reader, id);
        }
        self.read_value(reader, field)
    }

    /// Resolves a back-reference carrying `id` into a value of this codec's type.
    ///
    /// Only reference-tracked codecs can do this; for plain value codecs a
    /// reference is a protocol violation.
    fn resolve_reference(&self, reader: &mut Reader<'_>, id: u32) -> Result<T> {
        let _ = reader;
        Err(CodecError::ReferenceNotFound(id))
    }
}
