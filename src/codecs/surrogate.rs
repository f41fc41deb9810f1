//! Surrogate codecs: serializing foreign types through an owned stand-in shape.
//!
//! Types whose internals are not directly serializable (or not ours to depend on)
//! are converted to a surrogate value first; the surrogate's codec does the wire
//! work. The surrogate is wrapped in a tag-delimited object carrying the *outer*
//! type's identity at field 1, so the stand-in never leaks into the wire's type
//! vocabulary.

use std::marker::PhantomData;
use std::time::Duration;

use crate::codecs::containers::Tuple2Codec;
use crate::codecs::primitives::{U32Codec, U64Codec};
use crate::codecs::FieldCodec;
use crate::reader::Reader;
use crate::types::{well_known, TypeKey};
use crate::wire::{Field, WireType};
use crate::writer::Writer;
use crate::{CodecError, Result};

/// Converts between a foreign type and its serializable stand-in.
pub trait SurrogateConverter<T, S> {
    fn to_surrogate(&self, value: &T) -> S;
    fn from_surrogate(&self, surrogate: S) -> T;
}

/// Serializer for `T` expressed through a surrogate `S`.
pub struct SurrogateCodec<T, S, V, C> {
    converter: V,
    inner: C,
    key: TypeKey,
    _marker: PhantomData<fn() -> (T, S)>,
}

impl<T, S, V, C> SurrogateCodec<T, S, V, C>
where
    V: SurrogateConverter<T, S>,
    C: FieldCodec<S>,
{
    /// `key` is the outer type's wire identity; the surrogate's own key never
    /// appears on the wire.
    pub fn new(key: TypeKey, converter: V, inner: C) -> SurrogateCodec<T, S, V, C> {
        SurrogateCodec {
            converter,
            inner,
            key,
            _marker: PhantomData,
        }
    }
}

impl<T, S, V, C> FieldCodec<T> for SurrogateCodec<T, S, V, C>
where
    V: SurrogateConverter<T, S>,
    C: FieldCodec<S>,
{
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &T,
    ) -> Result<()> {
        let surrogate = self.converter.to_surrogate(value);
        writer.reserve_object_slot();
        writer.write_field_header(
            field_id_delta,
            expected,
            Some(&self.key),
            WireType::TagDelimited,
        );
        self.inner
            .write_field(writer, 1, Some(self.inner.type_key()), &surrogate)?;
        writer.write_end_object();
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<T> {
        if field.wire_type()? != WireType::TagDelimited {
            return Err(CodecError::UnexpectedWireType {
                actual: field.wire_type()?,
                reading: "surrogate",
            });
        }
        reader.create_record_placeholder();
        let mut surrogate: Option<S> = None;
        let mut fid = 0u32;
        loop {
            let header = reader.read_field_header()?;
            if header.is_end_object() {
                break;
            }
            if header.tag.is_end_base_fields() {
                fid = 0;
                continue;
            }
            fid += header.field_id_delta;
            match fid {
                1 => surrogate = Some(self.inner.read_field(reader, &header)?),
                _ => reader.consume_unknown_field(&header)?,
            }
        }
        let surrogate = surrogate.ok_or(CodecError::RequiredFieldMissing("surrogate value"))?;
        Ok(self.converter.from_surrogate(surrogate))
    }
}

/// Stand-in for [`Duration`]: whole seconds plus the sub-second nanoseconds.
pub struct DurationConverter;

impl SurrogateConverter<Duration, (u64, u32)> for DurationConverter {
    fn to_surrogate(&self, value: &Duration) -> (u64, u32) {
        (value.as_secs(), value.subsec_nanos())
    }

    fn from_surrogate(&self, surrogate: (u64, u32)) -> Duration {
        Duration::new(surrogate.0, surrogate.1)
    }
}

type DurationSurrogate =
    SurrogateCodec<Duration, (u64, u32), DurationConverter, Tuple2Codec<u64, u32, U64Codec, U32Codec>>;

/// Serializer for [`Duration`].
pub struct DurationCodec {
    inner: DurationSurrogate,
}

impl DurationCodec {
    pub fn new() -> DurationCodec {
        DurationCodec {
            inner: SurrogateCodec::new(
                well_known::DURATION.clone(),
                DurationConverter,
                Tuple2Codec::new(U64Codec, U32Codec),
            ),
        }
    }
}

impl Default for DurationCodec {
    fn default() -> DurationCodec {
        DurationCodec::new()
    }
}

impl FieldCodec<Duration> for DurationCodec {
    fn type_key(&self) -> &TypeKey {
        self.inner.type_key()
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &Duration,
    ) -> Result<()> {
        self.inner.write_field(writer, field_id_delta, expected, value)
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<Duration> {
        self.inner.read_value(reader, field)
    }
}
