//! The read-side cursor.
//!
//! A [`Reader`] mirrors [`Writer`](crate::Writer): it decodes field headers, reads
//! typed payloads (accepting any integer wire form a writer may have chosen), skips
//! fields it cannot interpret while keeping reference-id numbering aligned, and
//! supports constrained re-entry at an earlier offset to materialize previously
//! skipped fields on demand.

use std::any::Any;
use std::rc::Rc;

use crate::refs::{ReferenceEntry, UnknownFieldMarker};
use crate::session::DeserializerSession;
use crate::types::{well_known_key, TypeKey};
use crate::varint;
use crate::wire::{Field, SchemaType, Tag, WireType};
use crate::{CodecError, Result};

/// Sequential cursor over input bytes, bound to one session.
pub struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    pub session: &'a mut DeserializerSession,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a [u8], session: &'a mut DeserializerSession) -> Reader<'a> {
        Reader {
            input,
            pos: 0,
            session,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    // --- raw reads ---

    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = *self.input.get(self.pos).ok_or(CodecError::InsufficientData)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(CodecError::InsufficientData);
        }
        let slice = &self.input[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_varuint32(&mut self) -> Result<u32> {
        varint::read_varuint32(self.input, &mut self.pos)
    }

    pub fn read_varuint64(&mut self) -> Result<u64> {
        varint::read_varuint64(self.input, &mut self.pos)
    }

    pub fn read_fixed32(&mut self) -> Result<u32> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_fixed64(&mut self) -> Result<u64> {
        let bytes = self.read_slice(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Reads a varint byte count followed by that many raw bytes.
    pub fn read_length_prefixed(&mut self) -> Result<&'a [u8]> {
        let len = self.read_varuint64()?;
        if len > self.remaining() as u64 {
            return Err(CodecError::InsufficientData);
        }
        self.read_slice(len as usize)
    }

    // --- typed payload reads ---
    //
    // Writers choose the most compact wire form per value, so every integer reader
    // accepts VarInt, Fixed32 and Fixed64.

    pub fn read_uint64(&mut self, wire: WireType) -> Result<u64> {
        match wire {
            WireType::VarInt => self.read_varuint64(),
            WireType::Fixed32 => Ok(self.read_fixed32()? as u64),
            WireType::Fixed64 => self.read_fixed64(),
            actual => Err(CodecError::UnexpectedWireType {
                actual,
                reading: "unsigned integer",
            }),
        }
    }

    pub fn read_uint32(&mut self, wire: WireType) -> Result<u32> {
        let value = self.read_uint64(wire)?;
        u32::try_from(value).map_err(|_| CodecError::IntegerOutOfRange { reading: "u32" })
    }

    pub fn read_uint16(&mut self, wire: WireType) -> Result<u16> {
        let value = self.read_uint64(wire)?;
        u16::try_from(value).map_err(|_| CodecError::IntegerOutOfRange { reading: "u16" })
    }

    pub fn read_uint8(&mut self, wire: WireType) -> Result<u8> {
        let value = self.read_uint64(wire)?;
        u8::try_from(value).map_err(|_| CodecError::IntegerOutOfRange { reading: "u8" })
    }

    pub fn read_int64(&mut self, wire: WireType) -> Result<i64> {
        match wire {
            WireType::VarInt => Ok(varint::zigzag_decode64(self.read_varuint64()?)),
            WireType::Fixed32 => Ok(self.read_fixed32()? as i32 as i64),
            WireType::Fixed64 => Ok(self.read_fixed64()? as i64),
            actual => Err(CodecError::UnexpectedWireType {
                actual,
                reading: "signed integer",
            }),
        }
    }

    pub fn read_int32(&mut self, wire: WireType) -> Result<i32> {
        let value = self.read_int64(wire)?;
        i32::try_from(value).map_err(|_| CodecError::IntegerOutOfRange { reading: "i32" })
    }

    pub fn read_int16(&mut self, wire: WireType) -> Result<i16> {
        let value = self.read_int64(wire)?;
        i16::try_from(value).map_err(|_| CodecError::IntegerOutOfRange { reading: "i16" })
    }

    pub fn read_int8(&mut self, wire: WireType) -> Result<i8> {
        let value = self.read_int64(wire)?;
        i8::try_from(value).map_err(|_| CodecError::IntegerOutOfRange { reading: "i8" })
    }

    pub fn read_f32(&mut self, wire: WireType) -> Result<f32> {
        match wire {
            WireType::Fixed32 => Ok(f32::from_bits(self.read_fixed32()?)),
            WireType::Fixed64 => Ok(f64::from_bits(self.read_fixed64()?) as f32),
            actual => Err(CodecError::UnexpectedWireType {
                actual,
                reading: "f32",
            }),
        }
    }

    pub fn read_f64(&mut self, wire: WireType) -> Result<f64> {
        match wire {
            WireType::Fixed32 => Ok(f32::from_bits(self.read_fixed32()?) as f64),
            WireType::Fixed64 => Ok(f64::from_bits(self.read_fixed64()?)),
            actual => Err(CodecError::UnexpectedWireType {
                actual,
                reading: "f64",
            }),
        }
    }

    // --- field headers ---

    /// Decodes a field header: the tag byte, the extended field-id delta when
    /// present, and the type descriptor exactly as the writer encoded them.
    ///
    /// `Encoded` type descriptors register in the session's type table on first
    /// sight, mirroring the writer's assignment.
    pub fn read_field_header(&mut self) -> Result<Field> {
        let tag = Tag(self.read_byte()?);
        let wire = tag.wire_type()?;
        if wire == WireType::Extended {
            return Ok(Field::extended(tag));
        }
        let field_id_delta = if tag.has_extended_field_id() {
            self.read_varuint32()?
        } else {
            tag.embedded_field_id_delta()
        };
        let field_type = match tag.schema_type() {
            SchemaType::Expected => None,
            SchemaType::WellKnown => {
                let id = self.read_varuint32()?;
                Some(well_known_key(id).ok_or(CodecError::UnknownWellKnownType(id))?)
            }
            SchemaType::Referenced => {
                let id = self.read_varuint32()?;
                Some(
                    self.session
                        .types
                        .get(id)
                        .ok_or(CodecError::TypeReferenceNotFound(id))?,
                )
            }
            SchemaType::Encoded => {
                let name = self.read_length_prefixed()?;
                let name = std::str::from_utf8(name).map_err(|_| CodecError::InvalidTypeName)?;
                let key = TypeKey::new(name);
                self.session.types.register(key.clone());
                Some(key)
            }
        };
        Ok(Field {
            tag,
            field_id_delta,
            field_type,
        })
    }

    // --- skipping and deferred re-entry ---

    /// Advances past a field's payload using the wire type alone.
    ///
    /// Nested fields inside a skipped tag-delimited object each consume a
    /// reference-id slot and record a marker, so id numbering stays aligned with the
    /// writer and references into the skipped region remain resolvable.
    pub fn skip_field(&mut self, field: &Field) -> Result<()> {
        match field.wire_type()? {
            WireType::VarInt => {
                self.read_varuint64()?;
            }
            WireType::Fixed32 => {
                self.read_slice(4)?;
            }
            WireType::Fixed64 => {
                self.read_slice(8)?;
            }
            WireType::LengthPrefixed => {
                self.read_length_prefixed()?;
            }
            WireType::Reference => {
                self.read_varuint32()?;
            }
            WireType::TagDelimited => loop {
                let header = self.read_field_header()?;
                if header.is_end_object() {
                    break;
                }
                if header.tag.is_end_base_fields() {
                    continue;
                }
                self.consume_unknown_field(&header)?;
            },
            WireType::Extended => {}
        }
        Ok(())
    }

    /// Skips a field whose id the current schema does not recognize, recording an
    /// [`UnknownFieldMarker`] at the reference-id slot the field consumes so a later
    /// reference to it can be materialized on demand.
    pub fn consume_unknown_field(&mut self, field: &Field) -> Result<()> {
        let offset = self.pos;
        let reference_id = self.session.refs.consume_slot();
        self.session.refs.record_unresolved(UnknownFieldMarker {
            field: field.clone(),
            offset,
            reference_id,
        });
        self.skip_field(field)
    }

    /// Materializes a previously skipped field by re-entering the stream at the
    /// marker's payload offset.
    ///
    /// The cursor and the reference-id counter are saved, the counter is rewound to
    /// just below the marker's id (so slots consumed during the re-parse land on the
    /// same ids they would have in original order), and both are restored afterwards.
    pub fn read_deferred<T>(
        &mut self,
        marker: &UnknownFieldMarker,
        read: impl FnOnce(&mut Reader<'a>, &Field) -> Result<T>,
    ) -> Result<T> {
        let saved_pos = self.pos;
        let saved_id = self.session.refs.current_id();
        self.pos = marker.offset;
        self.session.refs.rewind_to(marker.reference_id - 1);
        let result = read(self, &marker.field);
        self.pos = saved_pos;
        self.session.refs.rewind_to(saved_id);
        result
    }

    // --- reference bookkeeping ---

    /// Consumes the reference-id slot for a value field.
    pub fn mark_value_field(&mut self) -> u32 {
        self.session.refs.consume_slot()
    }

    /// Consumes the reference-id slot for a composite about to be constructed,
    /// returning the id so the finished object can be recorded against it.
    pub fn create_record_placeholder(&mut self) -> u32 {
        self.session.refs.consume_slot()
    }

    /// Records (or patches) the object stored at a previously reserved slot.
    pub fn record_reference(&mut self, id: u32, value: Rc<dyn Any>) {
        self.session.refs.record(id, value);
    }

    /// Stages an object to be recorded at the next consumed slot; used by cyclic
    /// destinations constructed before their payload is parsed.
    pub fn set_pending_reference(&mut self, value: Rc<dyn Any>) {
        self.session.refs.set_pending(value);
    }

    pub fn current_reference_id(&self) -> u32 {
        self.session.refs.current_id()
    }

    pub fn reference_entry(&self, id: u32) -> Option<ReferenceEntry> {
        self.session.refs.get(id)
    }
}
