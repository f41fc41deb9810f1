//! Codecs for generic containers: sequences, maps, tuples and options.
//!
//! Containers are tag-delimited objects. A non-empty sequence or map declares its
//! length as field 0, then writes elements as repeated occurrences of field 1 (delta
//! 1 for the first element, 0 for the rest). Tuples write their elements at fields
//! 1..=N. `Option` is not an object at all: `None` is a null reference field and
//! `Some` is the inner value written directly under the option's field id.

use std::collections::HashMap;
use std::hash::Hash;
use std::marker::PhantomData;

use crate::codecs::FieldCodec;
use crate::reader::Reader;
use crate::types::TypeKey;
use crate::wire::{Field, WireType};
use crate::writer::Writer;
use crate::{CodecError, Result};

/// Length above which a declared collection size must also fit in the remaining
/// input before any allocation happens. Keeps a corrupt or hostile length prefix
/// from reserving unbounded memory; every element costs at least one byte, so a
/// declared length beyond the remaining input can never be satisfied.
pub const MAX_EAGER_COLLECTION_LEN: u64 = 10_240;

fn check_declared_length(declared: u64, remaining: usize) -> Result<()> {
    if declared > MAX_EAGER_COLLECTION_LEN && declared > remaining as u64 {
        return Err(CodecError::CollectionTooLarge {
            declared,
            remaining: remaining as u64,
        });
    }
    Ok(())
}

/// Serializer for `Vec<T>`, parameterized over the element codec.
pub struct VecCodec<T, C> {
    inner: C,
    key: TypeKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C: FieldCodec<T>> VecCodec<T, C> {
    pub fn new(inner: C) -> VecCodec<T, C> {
        let key = TypeKey::parameterized("vec", &[inner.type_key()]);
        VecCodec {
            inner,
            key,
            _marker: PhantomData,
        }
    }
}

impl<T, C: FieldCodec<T>> FieldCodec<Vec<T>> for VecCodec<T, C> {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &Vec<T>,
    ) -> Result<()> {
        writer.reserve_object_slot();
        writer.write_field_header(
            field_id_delta,
            expected,
            Some(&self.key),
            WireType::TagDelimited,
        );
        if !value.is_empty() {
            writer.mark_value_field();
            writer.write_field_header(0, None, None, WireType::VarInt);
            writer.write_varuint64(value.len() as u64);
            let mut delta = 1;
            for element in value {
                self.inner
                    .write_field(writer, delta, Some(self.inner.type_key()), element)?;
                delta = 0;
            }
        }
        writer.write_end_object();
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<Vec<T>> {
        if field.wire_type()? != WireType::TagDelimited {
            return Err(CodecError::UnexpectedWireType {
                actual: field.wire_type()?,
                reading: "vec",
            });
        }
        reader.create_record_placeholder();
        let mut result = Vec::new();
        let mut length: Option<u64> = None;
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
                0 => {
                    reader.mark_value_field();
                    let declared = reader.read_uint64(header.wire_type()?)?;
                    check_declared_length(declared, reader.remaining())?;
                    result.reserve(declared as usize);
                    length = Some(declared);
                }
                1 => {
                    if length.is_none() {
                        return Err(CodecError::RequiredFieldMissing("vec length"));
                    }
                    result.push(self.inner.read_field(reader, &header)?);
                }
                _ => reader.consume_unknown_field(&header)?,
            }
        }
        Ok(result)
    }
}

/// Serializer for `HashMap<K, V>`, parameterized over the key and value codecs.
///
/// Each entry is a nested tag-delimited object holding the key at field 0 and the
/// value at field 1, so keys and values can independently be references or carry
/// their own type information.
pub struct MapCodec<K, V, KC, VC> {
    key_codec: KC,
    value_codec: VC,
    key: TypeKey,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, KC, VC> MapCodec<K, V, KC, VC>
where
    KC: FieldCodec<K>,
    VC: FieldCodec<V>,
{
    pub fn new(key_codec: KC, value_codec: VC) -> MapCodec<K, V, KC, VC> {
        let key = TypeKey::parameterized("map", &[key_codec.type_key(), value_codec.type_key()]);
        MapCodec {
            key_codec,
            value_codec,
            key,
            _marker: PhantomData,
        }
    }

    fn read_entry(&self, reader: &mut Reader<'_>, field: &Field) -> Result<(K, V)> {
        if field.wire_type()? != WireType::TagDelimited {
            return Err(CodecError::UnexpectedWireType {
                actual: field.wire_type()?,
                reading: "map entry",
            });
        }
        reader.create_record_placeholder();
        let mut entry_key: Option<K> = None;
        let mut entry_value: Option<V> = None;
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
                0 => entry_key = Some(self.key_codec.read_field(reader, &header)?),
                1 => entry_value = Some(self.value_codec.read_field(reader, &header)?),
                _ => reader.consume_unknown_field(&header)?,
            }
        }
        let k = entry_key.ok_or(CodecError::RequiredFieldMissing("map entry key"))?;
        let v = entry_value.ok_or(CodecError::RequiredFieldMissing("map entry value"))?;
        Ok((k, v))
    }
}

impl<K, V, KC, VC> FieldCodec<HashMap<K, V>> for MapCodec<K, V, KC, VC>
where
    K: Eq + Hash,
    KC: FieldCodec<K>,
    VC: FieldCodec<V>,
{
    fn type_key(&self) -> &TypeKey {
        &self.key
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &HashMap<K, V>,
    ) -> Result<()> {
        writer.reserve_object_slot();
        writer.write_field_header(
            field_id_delta,
            expected,
            Some(&self.key),
            WireType::TagDelimited,
        );
        if !value.is_empty() {
            writer.mark_value_field();
            writer.write_field_header(0, None, None, WireType::VarInt);
            writer.write_varuint64(value.len() as u64);
            let mut delta = 1;
            for (k, v) in value {
                writer.reserve_object_slot();
                writer.write_field_header(delta, None, None, WireType::TagDelimited);
                self.key_codec
                    .write_field(writer, 0, Some(self.key_codec.type_key()), k)?;
                self.value_codec
                    .write_field(writer, 1, Some(self.value_codec.type_key()), v)?;
                writer.write_end_object();
                delta = 0;
            }
        }
        writer.write_end_object();
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<HashMap<K, V>> {
        if field.wire_type()? != WireType::TagDelimited {
            return Err(CodecError::UnexpectedWireType {
                actual: field.wire_type()?,
                reading: "map",
            });
        }
        reader.create_record_placeholder();
        let mut result = HashMap::new();
        let mut length: Option<u64> = None;
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
                0 => {
                    reader.mark_value_field();
                    let declared = reader.read_uint64(header.wire_type()?)?;
                    check_declared_length(declared, reader.remaining())?;
                    result.reserve(declared as usize);
                    length = Some(declared);
                }
                1 => {
                    if length.is_none() {
                        return Err(CodecError::RequiredFieldMissing("map length"));
                    }
                    let (k, v) = self.read_entry(reader, &header)?;
                    result.insert(k, v);
                }
                _ => reader.consume_unknown_field(&header)?,
            }
        }
        Ok(result)
    }
}

/// Serializer for `Option<T>`.
///
/// `None` occupies no reference slot beyond its own field: it is written as a
/// reference to the reserved null id 0. `Some` delegates entirely to the inner
/// codec, so an `Option<Rc<T>>` pointing at an already written object still
/// collapses to a back-reference.
pub struct OptionCodec<T, C> {
    inner: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C: FieldCodec<T>> OptionCodec<T, C> {
    pub fn new(inner: C) -> OptionCodec<T, C> {
        OptionCodec {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T, C: FieldCodec<T>> FieldCodec<Option<T>> for OptionCodec<T, C> {
    fn type_key(&self) -> &TypeKey {
        self.inner.type_key()
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &Option<T>,
    ) -> Result<()> {
        match value {
            None => {
                writer.write_null_reference(field_id_delta, expected);
                Ok(())
            }
            Some(inner) => self.inner.write_field(writer, field_id_delta, expected, inner),
        }
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<Option<T>> {
        Ok(Some(self.inner.read_value(reader, field)?))
    }

    fn resolve_reference(&self, reader: &mut Reader<'_>, id: u32) -> Result<Option<T>> {
        if id == 0 {
            return Ok(None);
        }
        Ok(Some(self.inner.resolve_reference(reader, id)?))
    }
}

macro_rules! tuple_codec {
    ($name:ident, $reading:literal, $(($idx:tt, $fid:literal, $missing:literal, $t:ident, $c:ident, $codec:ident, $slot:ident)),+) => {
        #[doc = concat!("Serializer for a ", $reading, ".")]
        pub struct $name<$($t,)+ $($c,)+> {
            $($codec: $c,)+
            key: TypeKey,
            _marker: PhantomData<fn() -> ($($t,)+)>,
        }

        impl<$($t,)+ $($c,)+> $name<$($t,)+ $($c,)+>
        where
            $($c: FieldCodec<$t>,)+
        {
            pub fn new($($codec: $c),+) -> Self {
                let key = TypeKey::parameterized("tuple", &[$($codec.type_key()),+]);
                $name {
                    $($codec,)+
                    key,
                    _marker: PhantomData,
                }
            }
        }

        impl<$($t,)+ $($c,)+> FieldCodec<($($t,)+)> for $name<$($t,)+ $($c,)+>
        where
            $($c: FieldCodec<$t>,)+
        {
            fn type_key(&self) -> &TypeKey {
                &self.key
            }

            fn write_field(
                &self,
                writer: &mut Writer<'_>,
                field_id_delta: u32,
                expected: Option<&TypeKey>,
                value: &($($t,)+),
            ) -> Result<()> {
                writer.reserve_object_slot();
                writer.write_field_header(
                    field_id_delta,
                    expected,
                    Some(&self.key),
                    WireType::TagDelimited,
                );
                $(
                    self.$codec
                        .write_field(writer, 1, Some(self.$codec.type_key()), &value.$idx)?;
                )+
                writer.write_end_object();
                Ok(())
            }

            fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> Result<($($t,)+)> {
                if field.wire_type()? != WireType::TagDelimited {
                    return Err(CodecError::UnexpectedWireType {
                        actual: field.wire_type()?,
                        reading: $reading,
                    });
                }
                reader.create_record_placeholder();
                $(let mut $slot: Option<$t> = None;)+
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
                        $($fid => $slot = Some(self.$codec.read_field(reader, &header)?),)+
                        _ => reader.consume_unknown_field(&header)?,
                    }
                }
                Ok(($(
                    $slot.ok_or(CodecError::RequiredFieldMissing($missing))?,
                )+))
            }
        }
    };
}

tuple_codec!(
    Tuple2Codec,
    "2-tuple",
    (0, 1u32, "tuple element 0", T0, C0, codec0, slot0),
    (1, 2u32, "tuple element 1", T1, C1, codec1, slot1)
);

tuple_codec!(
    Tuple3Codec,
    "3-tuple",
    (0, 1u32, "tuple element 0", T0, C0, codec0, slot0),
    (1, 2u32, "tuple element 1", T1, C1, codec1, slot1),
    (2, 3u32, "tuple element 2", T2, C2, codec2, slot2)
);

tuple_codec!(
    Tuple4Codec,
    "4-tuple",
    (0, 1u32, "tuple element 0", T0, C0, codec0, slot0),
    (1, 2u32, "tuple element 1", T1, C1, codec1, slot1),
    (2, 3u32, "tuple element 2", T2, C2, codec2, slot2),
    (3, 4u32, "tuple element 3", T3, C3, codec3, slot3)
);
