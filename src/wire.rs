//! The byte-level tag/field model.
//!
//! A field header is one tag byte, optionally followed by a varint field-id delta and
//! a type descriptor. The tag byte layout is part of the wire format:
//!
//! ```text
//! bit  7 6 5 | 4 3 | 2 1 0
//!      delta | sch | wire
//! ```
//!
//! `delta` holds field-id deltas 0..=6 inline; the all-ones pattern (7) means the
//! real delta follows as a varint. `sch` is the [`SchemaType`], `wire` the
//! [`WireType`]. The `Extended` wire type repurposes the upper bits as a marker code
//! (end-of-object, end-of-base-fields) and carries no payload.

use crate::types::TypeKey;
use crate::{CodecError, Result};

/// The low-level shape of a field's payload.
///
/// The wire type alone is enough to skip a field, which is what makes unknown fields
/// from newer schemas losslessly skippable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// A variable-length integer payload.
    VarInt = 0,
    /// Zero or more nested fields terminated by an end-of-object marker.
    TagDelimited = 1,
    /// A varint byte count followed by exactly that many raw bytes.
    LengthPrefixed = 2,
    /// Four bytes, little-endian.
    Fixed32 = 3,
    /// Eight bytes, little-endian.
    Fixed64 = 4,
    /// A varint reference id; 0 is reserved to mean null.
    Reference = 5,
    /// A marker byte with no payload (end-of-object, end-of-base-fields).
    Extended = 6,
}

impl WireType {
    pub(crate) fn from_bits(bits: u8) -> Option<WireType> {
        match bits {
            0 => Some(WireType::VarInt),
            1 => Some(WireType::TagDelimited),
            2 => Some(WireType::LengthPrefixed),
            3 => Some(WireType::Fixed32),
            4 => Some(WireType::Fixed64),
            5 => Some(WireType::Reference),
            6 => Some(WireType::Extended),
            _ => None,
        }
    }
}

/// How a field's type identity is communicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchemaType {
    /// No type information on the wire; the reader knows the type from context.
    Expected = 0,
    /// A small fixed numeric id shared by convention between writer and reader.
    WellKnown = 1,
    /// A numeric id scoped to this session, established by an earlier `Encoded`.
    Referenced = 2,
    /// The type's full identity spelled out in this occurrence.
    Encoded = 3,
}

impl SchemaType {
    pub(crate) fn from_bits(bits: u8) -> SchemaType {
        match bits & 0b11 {
            0 => SchemaType::Expected,
            1 => SchemaType::WellKnown,
            2 => SchemaType::Referenced,
            _ => SchemaType::Encoded,
        }
    }
}

const WIRE_TYPE_MASK: u8 = 0b0000_0111;
const SCHEMA_TYPE_SHIFT: u8 = 3;
const SCHEMA_TYPE_MASK: u8 = 0b0001_1000;
const FIELD_ID_SHIFT: u8 = 5;

/// Sentinel in the embedded delta bits: the real delta follows as a varint.
pub const EXTENDED_FIELD_ID: u32 = 7;

/// Extended marker closing a tag-delimited object.
pub const TAG_END_OBJECT: u8 = WireType::Extended as u8;
/// Extended marker separating a base type's fields from a derived type's own fields.
pub const TAG_END_BASE_FIELDS: u8 = WireType::Extended as u8 | (1 << SCHEMA_TYPE_SHIFT);

/// One decoded tag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag(pub u8);

impl Tag {
    /// Assembles a tag byte from its parts. `embedded_delta` must be 0..=7.
    pub fn new(wire: WireType, schema: SchemaType, embedded_delta: u32) -> Tag {
        debug_assert!(embedded_delta <= EXTENDED_FIELD_ID);
        Tag((wire as u8) | ((schema as u8) << SCHEMA_TYPE_SHIFT) | ((embedded_delta as u8) << FIELD_ID_SHIFT))
    }

    pub fn wire_type(self) -> Result<WireType> {
        WireType::from_bits(self.0 & WIRE_TYPE_MASK).ok_or(CodecError::InvalidTag(self.0))
    }

    pub fn schema_type(self) -> SchemaType {
        SchemaType::from_bits((self.0 & SCHEMA_TYPE_MASK) >> SCHEMA_TYPE_SHIFT)
    }

    pub fn embedded_field_id_delta(self) -> u32 {
        (self.0 >> FIELD_ID_SHIFT) as u32
    }

    /// True when the embedded delta bits hold the all-ones sentinel.
    pub fn has_extended_field_id(self) -> bool {
        self.embedded_field_id_delta() == EXTENDED_FIELD_ID
    }

    pub fn is_end_object(self) -> bool {
        self.0 == TAG_END_OBJECT
    }

    pub fn is_end_base_fields(self) -> bool {
        self.0 == TAG_END_BASE_FIELDS
    }
}

/// The decoded form of one field occurrence.
///
/// Constructed by [`Reader::read_field_header`](crate::Reader::read_field_header) and
/// consumed immediately by a codec. Not part of the persisted format.
#[derive(Debug, Clone)]
pub struct Field {
    pub tag: Tag,
    /// Delta from the previous field id within the same enclosing object.
    pub field_id_delta: u32,
    /// The resolved type, when the header carried one.
    pub field_type: Option<TypeKey>,
}

impl Field {
    pub(crate) fn extended(tag: Tag) -> Field {
        Field {
            tag,
            field_id_delta: 0,
            field_type: None,
        }
    }

    pub fn wire_type(&self) -> Result<WireType> {
        self.tag.wire_type()
    }

    pub fn is_end_object(&self) -> bool {
        self.tag.is_end_object()
    }

    pub fn is_end_base_or_end_object(&self) -> bool {
        self.tag.is_end_object() || self.tag.is_end_base_fields()
    }
}
