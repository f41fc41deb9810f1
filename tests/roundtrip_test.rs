use std::collections::HashMap;
use std::time::Duration;

use tangle_codec::codecs::containers::{MapCodec, OptionCodec, Tuple2Codec, Tuple3Codec, VecCodec};
use tangle_codec::codecs::primitives::{
    BoolCodec, BytesCodec, F32Codec, F64Codec, I16Codec, I32Codec, I64Codec, I8Codec, StringCodec,
    U16Codec, U32Codec, U64Codec, U8Codec,
};
use tangle_codec::codecs::surrogate::DurationCodec;
use tangle_codec::{CodecRegistry, FieldCodec, Serializer};

fn roundtrip<T>(codec: &impl FieldCodec<T>, value: &T) -> T {
    let serializer = Serializer::new(CodecRegistry::builder().build());
    let bytes = serializer.serialize(codec, value).unwrap();
    serializer.deserialize(codec, &bytes).unwrap()
}

#[test]
fn test_bool_roundtrip() {
    assert!(roundtrip(&BoolCodec, &true));
    assert!(!roundtrip(&BoolCodec, &false));
}

#[test]
fn test_small_integer_roundtrip() {
    assert_eq!(roundtrip(&U8Codec, &0u8), 0);
    assert_eq!(roundtrip(&U8Codec, &u8::MAX), u8::MAX);
    assert_eq!(roundtrip(&U16Codec, &u16::MAX), u16::MAX);
    assert_eq!(roundtrip(&I8Codec, &i8::MIN), i8::MIN);
    assert_eq!(roundtrip(&I8Codec, &-1i8), -1);
    assert_eq!(roundtrip(&I16Codec, &i16::MIN), i16::MIN);
    assert_eq!(roundtrip(&I16Codec, &i16::MAX), i16::MAX);
}

#[test]
fn test_i32_roundtrip_across_wire_forms() {
    // Values straddling the varint/fixed threshold at magnitude 2^20.
    for value in [
        0,
        1,
        -1,
        1 << 20,
        (1 << 20) + 1,
        -(1 << 20),
        -(1 << 20) - 1,
        i32::MIN,
        i32::MAX,
    ] {
        assert_eq!(roundtrip(&I32Codec, &value), value);
    }
}

#[test]
fn test_i32_wire_form_selection() {
    let serializer = Serializer::new(CodecRegistry::builder().build());
    // Tiny value: 1-byte header plus a 1-byte varint.
    let tiny = serializer.serialize(&I32Codec, &1).unwrap();
    assert_eq!(tiny.len(), 2);
    // Within the threshold: 1-byte header plus a 3-byte varint.
    let small = serializer.serialize(&I32Codec, &(1 << 19)).unwrap();
    assert_eq!(small.len(), 4);
    // Just past the threshold: 1-byte header plus 4 fixed bytes.
    let large = serializer.serialize(&I32Codec, &((1 << 20) + 1)).unwrap();
    assert_eq!(large.len(), 5);
}

#[test]
fn test_i64_roundtrip_across_wire_forms() {
    for value in [
        0,
        1 << 20,
        (1 << 20) + 1,
        -(1 << 20) - 1,
        i32::MAX as i64,
        i32::MAX as i64 + 1,
        i32::MIN as i64,
        i32::MIN as i64 - 1,
        i64::MIN,
        i64::MAX,
    ] {
        assert_eq!(roundtrip(&I64Codec, &value), value);
    }
}

#[test]
fn test_u32_u64_roundtrip() {
    for value in [0u32, 1 << 20, (1 << 20) + 1, u32::MAX] {
        assert_eq!(roundtrip(&U32Codec, &value), value);
    }
    for value in [0u64, (1 << 20) + 1, u32::MAX as u64, u32::MAX as u64 + 1, u64::MAX] {
        assert_eq!(roundtrip(&U64Codec, &value), value);
    }
}

#[test]
fn test_float_roundtrip() {
    for value in [0.0f32, -1.5, f32::MIN_POSITIVE, f32::MAX, f32::INFINITY] {
        assert_eq!(roundtrip(&F32Codec, &value), value);
    }
    for value in [0.0f64, 2.5e300, f64::MIN, f64::NEG_INFINITY] {
        assert_eq!(roundtrip(&F64Codec, &value), value);
    }
    assert!(roundtrip(&F64Codec, &f64::NAN).is_nan());
}

#[test]
fn test_string_roundtrip() {
    for value in ["", "hello", "ラスト", "emoji \u{1f980}"] {
        assert_eq!(roundtrip(&StringCodec, &value.to_string()), value);
    }
}

#[test]
fn test_bytes_roundtrip() {
    assert_eq!(roundtrip(&BytesCodec, &vec![]), Vec::<u8>::new());
    assert_eq!(roundtrip(&BytesCodec, &vec![0, 1, 255, 128]), vec![0, 1, 255, 128]);
}

#[test]
fn test_duration_roundtrip() {
    let codec = DurationCodec::new();
    for value in [
        Duration::ZERO,
        Duration::new(5, 123_456_789),
        Duration::new(u64::MAX / 2, 999_999_999),
    ] {
        assert_eq!(roundtrip(&codec, &value), value);
    }
}

#[test]
fn test_vec_roundtrip() {
    let codec = VecCodec::new(I64Codec);
    assert_eq!(roundtrip(&codec, &vec![1i64, 300, 70_000]), vec![1, 300, 70_000]);
    assert_eq!(roundtrip(&codec, &vec![]), Vec::<i64>::new());
}

#[test]
fn test_nested_vec_roundtrip() {
    let codec = VecCodec::new(VecCodec::new(I32Codec));
    let value = vec![vec![1, 2], vec![], vec![3]];
    assert_eq!(roundtrip(&codec, &value), value);
}

#[test]
fn test_map_roundtrip() {
    let codec = MapCodec::new(StringCodec, I64Codec);
    let mut value = HashMap::new();
    value.insert("one".to_string(), 1i64);
    value.insert("big".to_string(), 1 << 40);
    assert_eq!(roundtrip(&codec, &value), value);
    assert_eq!(roundtrip(&codec, &HashMap::new()), HashMap::new());
}

#[test]
fn test_tuple_roundtrip() {
    let codec = Tuple2Codec::new(I32Codec, StringCodec);
    let value = (42, "answer".to_string());
    assert_eq!(roundtrip(&codec, &value), value);

    let codec = Tuple3Codec::new(BoolCodec, F64Codec, U8Codec);
    let value = (true, 0.25, 7u8);
    assert_eq!(roundtrip(&codec, &value), value);
}

#[test]
fn test_option_roundtrip() {
    let codec = OptionCodec::new(I32Codec);
    assert_eq!(roundtrip(&codec, &Some(5)), Some(5));
    assert_eq!(roundtrip(&codec, &None), None);

    let codec = OptionCodec::new(VecCodec::new(StringCodec));
    let value = Some(vec!["a".to_string(), "b".to_string()]);
    assert_eq!(roundtrip(&codec, &value), value);
}
