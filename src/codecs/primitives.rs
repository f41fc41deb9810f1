//! Codecs for primitive values.
//!
//! Integer codecs choose the most compact wire form per value: magnitudes within
//! 2^20 go out as varints, larger values as fixed-width words. The choice is made at
//! write time, so readers accept any of the integer wire forms for a given logical
//! type.

use crate::codecs::FieldCodec;
use crate::reader::Reader;
use crate::types::{well_known, TypeKey};
use crate::wire::{Field, WireType};
use crate::writer::Writer;
use crate::{CodecError, Result};

/// Magnitude threshold above which fixed-width encoding beats a varint.
const VARINT_MAGNITUDE_LIMIT: u64 = 1 << 20;

/// Serializer for `bool`.
pub struct BoolCodec;

impl FieldCodec<bool> for BoolCodec {
    fn type_key(&self) -> &TypeKey {
        &well_known::BOOL
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &bool,
    ) -> Result<()> {
        writer.mark_value_field();
        writer.write_field_header(field_id_delta, expected, Some(self.type_key()), WireType::VarInt);
        writer.write_varuint32(u32::from(*value));
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<bool> {
        reader.mark_value_field();
        Ok(reader.read_uint8(field.wire_type()?)? != 0)
    }
}

macro_rules! small_uint_codec {
    ($name:ident, $ty:ty, $key:expr, $read:ident) => {
        #[doc = concat!("Serializer for `", stringify!($ty), "`.")]
        pub struct $name;

        impl FieldCodec<$ty> for $name {
            fn type_key(&self) -> &TypeKey {
                &$key
            }

            fn write_field(
                &self,
                writer: &mut Writer<'_>,
                field_id_delta: u32,
                expected: Option<&TypeKey>,
                value: &$ty,
            ) -> Result<()> {
                writer.mark_value_field();
                writer.write_field_header(
                    field_id_delta,
                    expected,
                    Some(self.type_key()),
                    WireType::VarInt,
                );
                writer.write_varuint32(*value as u32);
                Ok(())
            }

            fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<$ty> {
                reader.mark_value_field();
                reader.$read(field.wire_type()?)
            }
        }
    };
}

macro_rules! small_int_codec {
    ($name:ident, $ty:ty, $key:expr, $read:ident) => {
        #[doc = concat!("Serializer for `", stringify!($ty), "`.")]
        pub struct $name;

        impl FieldCodec<$ty> for $name {
            fn type_key(&self) -> &TypeKey {
                &$key
            }

            fn write_field(
                &self,
                writer: &mut Writer<'_>,
                field_id_delta: u32,
                expected: Option<&TypeKey>,
                value: &$ty,
            ) -> Result<()> {
                writer.mark_value_field();
                writer.write_field_header(
                    field_id_delta,
                    expected,
                    Some(self.type_key()),
                    WireType::VarInt,
                );
                writer.write_varint32(*value as i32);
                Ok(())
            }

            fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<$ty> {
                reader.mark_value_field();
                reader.$read(field.wire_type()?)
            }
        }
    };
}

small_uint_codec!(U8Codec, u8, well_known::U8, read_uint8);
small_uint_codec!(U16Codec, u16, well_known::U16, read_uint16);
small_int_codec!(I8Codec, i8, well_known::I8, read_int8);
small_int_codec!(I16Codec, i16, well_known::I16, read_int16);

/// Serializer for `u32`.
pub struct U32Codec;

impl FieldCodec<u32> for U32Codec {
    fn type_key(&self) -> &TypeKey {
        &well_known::U32
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &u32,
    ) -> Result<()> {
        writer.mark_value_field();
        if *value as u64 > VARINT_MAGNITUDE_LIMIT {
            writer.write_field_header(field_id_delta, expected, Some(self.type_key()), WireType::Fixed32);
            writer.write_fixed32(*value);
        } else {
            writer.write_field_header(field_id_delta, expected, Some(self.type_key()), WireType::VarInt);
            writer.write_varuint32(*value);
        }
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<u32> {
        reader.mark_value_field();
        reader.read_uint32(field.wire_type()?)
    }
}

/// Serializer for `u64`.
pub struct U64Codec;

impl FieldCodec<u64> for U64Codec {
    fn type_key(&self) -> &TypeKey {
        &well_known::U64
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &u64,
    ) -> Result<()> {
        writer.mark_value_field();
        if *value <= VARINT_MAGNITUDE_LIMIT {
            writer.write_field_header(field_id_delta, expected, Some(self.type_key()), WireType::VarInt);
            writer.write_varuint64(*value);
        } else if *value <= u32::MAX as u64 {
            writer.write_field_header(field_id_delta, expected, Some(self.type_key()), WireType::Fixed32);
            writer.write_fixed32(*value as u32);
        } else {
            writer.write_field_header(field_id_delta, expected, Some(self.type_key()), WireType::Fixed64);
            writer.write_fixed64(*value);
        }
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<u64> {
        reader.mark_value_field();
        reader.read_uint64(field.wire_type()?)
    }
}

/// Serializer for `i32`.
pub struct I32Codec;

impl FieldCodec<i32> for I32Codec {
    fn type_key(&self) -> &TypeKey {
        &well_known::I32
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &i32,
    ) -> Result<()> {
        writer.mark_value_field();
        if value.unsigned_abs() as u64 > VARINT_MAGNITUDE_LIMIT {
            writer.write_field_header(field_id_delta, expected, Some(self.type_key()), WireType::Fixed32);
            writer.write_fixed32(*value as u32);
        } else {
            writer.write_field_header(field_id_delta, expected, Some(self.type_key()), WireType::VarInt);
            writer.write_varint32(*value);
        }
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<i32> {
        reader.mark_value_field();
        reader.read_int32(field.wire_type()?)
    }
}

/// Serializer for `i64`.
pub struct I64Codec;

impl FieldCodec<i64> for I64Codec {
    fn type_key(&self) -> &TypeKey {
        &well_known::I64
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &i64,
    ) -> Result<()> {
        writer.mark_value_field();
        if value.unsigned_abs() <= VARINT_MAGNITUDE_LIMIT {
            writer.write_field_header(field_id_delta, expected, Some(self.type_key()), WireType::VarInt);
            writer.write_varint64(*value);
        } else if i32::try_from(*value).is_ok() {
            writer.write_field_header(field_id_delta, expected, Some(self.type_key()), WireType::Fixed32);
            writer.write_fixed32(*value as i32 as u32);
        } else {
            writer.write_field_header(field_id_delta, expected, Some(self.type_key()), WireType::Fixed64);
            writer.write_fixed64(*value as u64);
        }
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<i64> {
        reader.mark_value_field();
        reader.read_int64(field.wire_type()?)
    }
}

/// Serializer for `f32` (four bytes, little-endian IEEE 754).
pub struct F32Codec;

impl FieldCodec<f32> for F32Codec {
    fn type_key(&self) -> &TypeKey {
        &well_known::F32
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &f32,
    ) -> Result<()> {
        writer.mark_value_field();
        writer.write_field_header(field_id_delta, expected, Some(self.type_key()), WireType::Fixed32);
        writer.write_fixed32(value.to_bits());
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<f32> {
        reader.mark_value_field();
        reader.read_f32(field.wire_type()?)
    }
}

/// Serializer for `f64` (eight bytes, little-endian IEEE 754).
pub struct F64Codec;

impl FieldCodec<f64> for F64Codec {
    fn type_key(&self) -> &TypeKey {
        &well_known::F64
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &f64,
    ) -> Result<()> {
        writer.mark_value_field();
        writer.write_field_header(field_id_delta, expected, Some(self.type_key()), WireType::Fixed64);
        writer.write_fixed64(value.to_bits());
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<f64> {
        reader.mark_value_field();
        reader.read_f64(field.wire_type()?)
    }
}

/// Serializer for `String`: a length-prefixed UTF-8 payload.
pub struct StringCodec;

impl FieldCodec<String> for StringCodec {
    fn type_key(&self) -> &TypeKey {
        &well_known::STRING
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &String,
    ) -> Result<()> {
        writer.mark_value_field();
        writer.write_field_header(
            field_id_delta,
            expected,
            Some(self.type_key()),
            WireType::LengthPrefixed,
        );
        writer.write_length_prefixed(value.as_bytes());
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<String> {
        reader.mark_value_field();
        match field.wire_type()? {
            WireType::LengthPrefixed => {
                let bytes = reader.read_length_prefixed()?;
                Ok(std::str::from_utf8(bytes)?.to_owned())
            }
            actual => Err(CodecError::UnexpectedWireType {
                actual,
                reading: "string",
            }),
        }
    }
}

/// Serializer for raw byte payloads (`Vec<u8>`).
pub struct BytesCodec;

impl FieldCodec<Vec<u8>> for BytesCodec {
    fn type_key(&self) -> &TypeKey {
        &well_known::BYTES
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &Vec<u8>,
    ) -> Result<()> {
        writer.mark_value_field();
        writer.write_field_header(
            field_id_delta,
            expected,
            Some(self.type_key()),
            WireType::LengthPrefixed,
        );
        writer.write_length_prefixed(value);
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<Vec<u8>> {
        reader.mark_value_field();
        match field.wire_type()? {
            WireType::LengthPrefixed => Ok(reader.read_length_prefixed()?.to_vec()),
            actual => Err(CodecError::UnexpectedWireType {
                actual,
                reading: "bytes",
            }),
        }
    }
}
