//! The top-level entry points.
//!
//! A [`Serializer`] holds a shared registry and spins up a fresh session per
//! operation, so reference-id and type-id numbering always starts from a clean
//! slate. Statically typed entry points take the codec or copier explicitly;
//! the `_any` variants dispatch through the registry by runtime type.

use bytes::{Bytes, BytesMut};
use std::sync::Arc;

use crate::codecs::FieldCodec;
use crate::copy::{CopyContext, DeepCopier};
use crate::reader::Reader;
use crate::registry::{AnyCodec, CodecRegistry, DynValue};
use crate::session::{DeserializerSession, SerializerSession};
use crate::writer::Writer;
use crate::Result;

/// Shared, thread-safe entry point for serialize, deserialize and deep-copy.
pub struct Serializer {
    registry: Arc<CodecRegistry>,
}

impl Serializer {
    pub fn new(registry: Arc<CodecRegistry>) -> Serializer {
        Serializer { registry }
    }

    pub fn registry(&self) -> &Arc<CodecRegistry> {
        &self.registry
    }

    /// Serializes `value` as a single root field with id 0.
    ///
    /// The root is written with its own type as the expected type, so no type
    /// information appears on the wire unless a nested field needs it.
    pub fn serialize<T>(&self, codec: &impl FieldCodec<T>, value: &T) -> Result<Bytes> {
        let mut session = SerializerSession::new(self.registry.clone());
        let mut output = BytesMut::new();
        let mut writer = Writer::new(&mut output, &mut session);
        codec.write_field(&mut writer, 0, Some(codec.type_key()), value)?;
        Ok(output.freeze())
    }

    /// Deserializes a single root field written by [`serialize`](Serializer::serialize).
    pub fn deserialize<T>(&self, codec: &impl FieldCodec<T>, input: &[u8]) -> Result<T> {
        let mut session = DeserializerSession::new(self.registry.clone());
        let mut reader = Reader::new(input, &mut session);
        let field = reader.read_field_header()?;
        codec.read_field(&mut reader, &field)
    }

    /// Serializes a dynamically typed value; the root field carries full type
    /// information so the peer can dispatch without static knowledge.
    pub fn serialize_any(&self, value: &DynValue) -> Result<Bytes> {
        self.serialize(&AnyCodec, value)
    }

    /// Deserializes a value whose type is described on the wire.
    pub fn deserialize_any(&self, input: &[u8]) -> Result<DynValue> {
        self.deserialize(&AnyCodec, input)
    }

    /// Deep-copies a value with a fresh identity map, preserving aliasing and
    /// terminating on cycles.
    pub fn deep_copy<T>(&self, copier: &impl DeepCopier<T>, value: &T) -> Result<T> {
        let mut context = CopyContext::new(self.registry.clone());
        copier.deep_copy(value, &mut context)
    }

    /// Deep-copies a dynamically typed value through the registry.
    pub fn deep_copy_any(&self, value: &DynValue) -> Result<DynValue> {
        let mut context = CopyContext::new(self.registry.clone());
        context.copy_any(value)
    }
}
