//! Round trips through hand-written codecs for record types, the shape generated
//! serializers would take: a tag-delimited object with one field per member, read
//! back with a delta-accumulating field loop that skips anything unrecognized.

use tangle_codec::codecs::containers::VecCodec;
use tangle_codec::codecs::primitives::{I32Codec, I64Codec, StringCodec};
use tangle_codec::types::{well_known, TypeKey};
use tangle_codec::wire::WireType;
use tangle_codec::{CodecRegistry, Field, FieldCodec, Reader, Serializer, Writer};

#[derive(Debug, Clone, PartialEq, Default)]
struct Sensor {
    id: i32,
    name: String,
    samples: Vec<i64>,
}

static SENSOR_KEY: TypeKey = TypeKey::from_static("sensor");

struct SensorCodec;

impl FieldCodec<Sensor> for SensorCodec {
    fn type_key(&self) -> &TypeKey {
        &SENSOR_KEY
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &Sensor,
    ) -> tangle_codec::Result<()> {
        writer.reserve_object_slot();
        writer.write_field_header(field_id_delta, expected, Some(&SENSOR_KEY), WireType::TagDelimited);
        I32Codec.write_field(writer, 0, Some(&well_known::I32), &value.id)?;
        StringCodec.write_field(writer, 1, Some(&well_known::STRING), &value.name)?;
        let samples = VecCodec::new(I64Codec);
        samples.write_field(writer, 1, Some(samples.type_key()), &value.samples)?;
        writer.write_end_object();
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> tangle_codec::Result<Sensor> {
        assert_eq!(field.wire_type()?, WireType::TagDelimited);
        reader.create_record_placeholder();
        let mut result = Sensor::default();
        let mut fid = 0u32;
        loop {
            let header = reader.read_field_header()?;
            if header.is_end_object() {
                break;
            }
            fid += header.field_id_delta;
            match fid {
                0 => result.id = I32Codec.read_field(reader, &header)?,
                1 => result.name = StringCodec.read_field(reader, &header)?,
                2 => result.samples = VecCodec::new(I64Codec).read_field(reader, &header)?,
                _ => reader.consume_unknown_field(&header)?,
            }
        }
        Ok(result)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Station {
    label: String,
    primary: Sensor,
    backup: Sensor,
}

static STATION_KEY: TypeKey = TypeKey::from_static("station");

struct StationCodec;

impl FieldCodec<Station> for StationCodec {
    fn type_key(&self) -> &TypeKey {
        &STATION_KEY
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &Station,
    ) -> tangle_codec::Result<()> {
        writer.reserve_object_slot();
        writer.write_field_header(field_id_delta, expected, Some(&STATION_KEY), WireType::TagDelimited);
        StringCodec.write_field(writer, 0, Some(&well_known::STRING), &value.label)?;
        SensorCodec.write_field(writer, 1, Some(&SENSOR_KEY), &value.primary)?;
        SensorCodec.write_field(writer, 1, Some(&SENSOR_KEY), &value.backup)?;
        writer.write_end_object();
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> tangle_codec::Result<Station> {
        assert_eq!(field.wire_type()?, WireType::TagDelimited);
        reader.create_record_placeholder();
        let mut result = Station::default();
        let mut fid = 0u32;
        loop {
            let header = reader.read_field_header()?;
            if header.is_end_object() {
                break;
            }
            fid += header.field_id_delta;
            match fid {
                0 => result.label = StringCodec.read_field(reader, &header)?,
                1 => result.primary = SensorCodec.read_field(reader, &header)?,
                2 => result.backup = SensorCodec.read_field(reader, &header)?,
                _ => reader.consume_unknown_field(&header)?,
            }
        }
        Ok(result)
    }
}

#[test]
fn test_record_roundtrip() {
    let serializer = Serializer::new(CodecRegistry::builder().build());
    let original = Sensor {
        id: 42,
        name: "thermo".to_string(),
        samples: vec![1, 300, 70_000],
    };
    let bytes = serializer.serialize(&SensorCodec, &original).unwrap();
    let decoded = serializer.deserialize(&SensorCodec, &bytes).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_empty_record_roundtrip() {
    let serializer = Serializer::new(CodecRegistry::builder().build());
    let original = Sensor::default();
    let bytes = serializer.serialize(&SensorCodec, &original).unwrap();
    let decoded = serializer.deserialize(&SensorCodec, &bytes).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_nested_record_roundtrip() {
    let serializer = Serializer::new(CodecRegistry::builder().build());
    let original = Station {
        label: "north".to_string(),
        primary: Sensor {
            id: 1,
            name: "a".to_string(),
            samples: vec![10, 20],
        },
        backup: Sensor {
            id: 2,
            name: "b".to_string(),
            samples: vec![],
        },
    };
    let bytes = serializer.serialize(&StationCodec, &original).unwrap();
    let decoded = serializer.deserialize(&StationCodec, &bytes).unwrap();
    assert_eq!(decoded, original);
}
