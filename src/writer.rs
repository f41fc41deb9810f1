//! The write-side cursor.
//!
//! A [`Writer`] appends well-formed tagged fields to a growable output buffer.
//! Writes never fail on valid input; callers are responsible for supplying values
//! within documented ranges.

use bytes::{BufMut, BytesMut};

use crate::session::SerializerSession;
use crate::types::{well_known_id, TypeKey};
use crate::varint;
use crate::wire::{SchemaType, Tag, WireType, EXTENDED_FIELD_ID, TAG_END_BASE_FIELDS, TAG_END_OBJECT};

/// Sequential, append-only cursor over an output buffer, bound to one session.
pub struct Writer<'a> {
    output: &'a mut BytesMut,
    pub session: &'a mut SerializerSession,
}

impl<'a> Writer<'a> {
    pub fn new(output: &'a mut BytesMut, session: &'a mut SerializerSession) -> Writer<'a> {
        Writer { output, session }
    }

    /// Bytes written so far.
    pub fn position(&self) -> usize {
        self.output.len()
    }

    /// Writes a field header: the tag byte, the extended field-id delta when the
    /// embedded bits cannot hold it, and the type descriptor when the actual type is
    /// not implied by context.
    ///
    /// When `actual` is absent or equal to `expected`, the cheapest header is
    /// emitted (`SchemaType::Expected`, no type payload). Otherwise the type is
    /// resolved well-known → session-referenced → fully encoded, cheapest first; the
    /// first encoded occurrence also registers the type for later `Referenced` use.
    pub fn write_field_header(
        &mut self,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        actual: Option<&TypeKey>,
        wire: WireType,
    ) {
        enum TypeDescriptor {
            None,
            Id(u32),
            Name(TypeKey),
        }

        let (schema, descriptor) = match actual {
            None => (SchemaType::Expected, TypeDescriptor::None),
            Some(a) if expected == Some(a) => (SchemaType::Expected, TypeDescriptor::None),
            Some(a) => {
                if let Some(id) = well_known_id(a) {
                    (SchemaType::WellKnown, TypeDescriptor::Id(id))
                } else if let Some(id) = self.session.types.get(a) {
                    (SchemaType::Referenced, TypeDescriptor::Id(id))
                } else {
                    self.session.types.register(a.clone());
                    (SchemaType::Encoded, TypeDescriptor::Name(a.clone()))
                }
            }
        };

        let embedded = field_id_delta.min(EXTENDED_FIELD_ID);
        self.output.put_u8(Tag::new(wire, schema, embedded).0);
        if embedded == EXTENDED_FIELD_ID {
            varint::write_varuint32(self.output, field_id_delta);
        }
        match descriptor {
            TypeDescriptor::None => {}
            TypeDescriptor::Id(id) => varint::write_varuint32(self.output, id),
            TypeDescriptor::Name(key) => {
                let name = key.as_str().as_bytes();
                varint::write_varuint64(self.output, name.len() as u64);
                self.output.put_slice(name);
            }
        }
    }

    // --- reference bookkeeping ---

    /// Consumes the reference-id slot for a value field (primitives and other
    /// untracked values), keeping id numbering aligned with the reader.
    pub fn mark_value_field(&mut self) -> u32 {
        self.session.refs.consume_slot()
    }

    /// Consumes the reference-id slot for an owned composite about to be written.
    pub fn reserve_object_slot(&mut self) -> u32 {
        self.session.refs.consume_slot()
    }

    /// Consults the reference table for a trackable object. If the object was
    /// already written, emits a `Reference` field carrying its id and returns
    /// `true`; the caller must then skip serializing the value. Otherwise stages the
    /// identity so the slot consumed by the value's own codec records it, and
    /// returns `false`.
    pub fn try_write_reference(
        &mut self,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        identity: usize,
    ) -> bool {
        if let Some(id) = self.session.refs.get(identity) {
            self.write_reference_field(field_id_delta, expected, id);
            return true;
        }
        self.session.refs.set_pending(identity);
        false
    }

    /// Emits a `Reference` field carrying the reserved null id.
    pub fn write_null_reference(&mut self, field_id_delta: u32, expected: Option<&TypeKey>) {
        self.write_reference_field(field_id_delta, expected, 0);
    }

    fn write_reference_field(&mut self, field_id_delta: u32, expected: Option<&TypeKey>, id: u32) {
        self.mark_value_field();
        self.write_field_header(field_id_delta, expected, None, WireType::Reference);
        varint::write_varuint32(self.output, id);
    }

    // --- primitive writes ---

    pub fn write_byte(&mut self, value: u8) {
        self.output.put_u8(value);
    }

    pub fn write_varuint32(&mut self, value: u32) {
        varint::write_varuint32(self.output, value);
    }

    pub fn write_varuint64(&mut self, value: u64) {
        varint::write_varuint64(self.output, value);
    }

    pub fn write_varint32(&mut self, value: i32) {
        varint::write_varint32(self.output, value);
    }

    pub fn write_varint64(&mut self, value: i64) {
        varint::write_varint64(self.output, value);
    }

    pub fn write_fixed32(&mut self, value: u32) {
        self.output.put_u32_le(value);
    }

    pub fn write_fixed64(&mut self, value: u64) {
        self.output.put_u64_le(value);
    }

    /// Writes a varint byte count followed by the raw bytes.
    pub fn write_length_prefixed(&mut self, payload: &[u8]) {
        varint::write_varuint64(self.output, payload.len() as u64);
        self.output.put_slice(payload);
    }

    /// Closes a tag-delimited object.
    pub fn write_end_object(&mut self) {
        self.output.put_u8(TAG_END_OBJECT);
    }

    /// Separates a base type's fields from a derived type's own fields.
    pub fn write_end_base_fields(&mut self) {
        self.output.put_u8(TAG_END_BASE_FIELDS);
    }
}
