//! Aliasing preservation and cyclic object graphs.

use std::cell::RefCell;
use std::rc::Rc;

use tangle_codec::codecs::containers::{OptionCodec, VecCodec};
use tangle_codec::codecs::primitives::{I32Codec, I64Codec, StringCodec};
use tangle_codec::codecs::reference::{RcCodec, RcRefCellCodec};
use tangle_codec::types::{well_known, TypeKey};
use tangle_codec::wire::WireType;
use tangle_codec::{CodecRegistry, Field, FieldCodec, Reader, Serializer, Writer};

#[derive(Debug, PartialEq)]
struct Pair {
    left: Rc<String>,
    right: Rc<String>,
}

static PAIR_KEY: TypeKey = TypeKey::from_static("pair");

struct PairCodec;

impl FieldCodec<Pair> for PairCodec {
    fn type_key(&self) -> &TypeKey {
        &PAIR_KEY
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &Pair,
    ) -> tangle_codec::Result<()> {
        let inner = RcCodec::new(StringCodec);
        writer.reserve_object_slot();
        writer.write_field_header(field_id_delta, expected, Some(&PAIR_KEY), WireType::TagDelimited);
        inner.write_field(writer, 0, Some(&well_known::STRING), &value.left)?;
        inner.write_field(writer, 1, Some(&well_known::STRING), &value.right)?;
        writer.write_end_object();
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> tangle_codec::Result<Pair> {
        assert_eq!(field.wire_type()?, WireType::TagDelimited);
        reader.create_record_placeholder();
        let inner = RcCodec::new(StringCodec);
        let mut left = None;
        let mut right = None;
        let mut fid = 0u32;
        loop {
            let header = reader.read_field_header()?;
            if header.is_end_object() {
                break;
            }
            fid += header.field_id_delta;
            match fid {
                0 => left = Some(inner.read_field(reader, &header)?),
                1 => right = Some(inner.read_field(reader, &header)?),
                _ => reader.consume_unknown_field(&header)?,
            }
        }
        Ok(Pair {
            left: left.unwrap(),
            right: right.unwrap(),
        })
    }
}

#[test]
fn test_aliased_rc_collapses_to_one_payload() {
    let serializer = Serializer::new(CodecRegistry::builder().build());
    let shared = Rc::new("shared".to_string());
    let aliased = Pair {
        left: shared.clone(),
        right: shared,
    };
    let aliased_bytes = serializer.serialize(&PairCodec, &aliased).unwrap();

    let distinct = Pair {
        left: Rc::new("shared".to_string()),
        right: Rc::new("shared".to_string()),
    };
    let distinct_bytes = serializer.serialize(&PairCodec, &distinct).unwrap();

    // The second occurrence of the aliased value is a reference, not a payload.
    assert!(aliased_bytes.len() < distinct_bytes.len());

    let decoded = serializer.deserialize(&PairCodec, &aliased_bytes).unwrap();
    assert_eq!(*decoded.left, "shared");
    assert!(Rc::ptr_eq(&decoded.left, &decoded.right));

    let decoded = serializer.deserialize(&PairCodec, &distinct_bytes).unwrap();
    assert!(!Rc::ptr_eq(&decoded.left, &decoded.right));
}

#[test]
fn test_aliased_elements_in_vec() {
    let serializer = Serializer::new(CodecRegistry::builder().build());
    let codec = VecCodec::new(RcCodec::new(I64Codec));
    let shared = Rc::new(9_000_000i64);
    let value = vec![shared.clone(), Rc::new(7), shared];
    let bytes = serializer.serialize(&codec, &value).unwrap();
    let decoded = serializer.deserialize(&codec, &bytes).unwrap();
    assert_eq!(*decoded[0], 9_000_000);
    assert_eq!(*decoded[1], 7);
    assert!(Rc::ptr_eq(&decoded[0], &decoded[2]));
    assert!(!Rc::ptr_eq(&decoded[0], &decoded[1]));
}

#[derive(Debug, Default)]
struct Node {
    value: i32,
    next: Option<Rc<RefCell<Node>>>,
}

static NODE_KEY: TypeKey = TypeKey::from_static("node");

struct NodeCodec;

impl NodeCodec {
    fn next_codec() -> OptionCodec<Rc<RefCell<Node>>, RcRefCellCodec<Node, NodeCodec>> {
        OptionCodec::new(RcRefCellCodec::new(NodeCodec))
    }
}

impl FieldCodec<Node> for NodeCodec {
    fn type_key(&self) -> &TypeKey {
        &NODE_KEY
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &Node,
    ) -> tangle_codec::Result<()> {
        writer.reserve_object_slot();
        writer.write_field_header(field_id_delta, expected, Some(&NODE_KEY), WireType::TagDelimited);
        I32Codec.write_field(writer, 0, Some(&well_known::I32), &value.value)?;
        Self::next_codec().write_field(writer, 1, Some(&NODE_KEY), &value.next)?;
        writer.write_end_object();
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> tangle_codec::Result<Node> {
        assert_eq!(field.wire_type()?, WireType::TagDelimited);
        reader.create_record_placeholder();
        let mut result = Node::default();
        let mut fid = 0u32;
        loop {
            let header = reader.read_field_header()?;
            if header.is_end_object() {
                break;
            }
            fid += header.field_id_delta;
            match fid {
                0 => result.value = I32Codec.read_field(reader, &header)?,
                1 => result.next = Self::next_codec().read_field(reader, &header)?,
                _ => reader.consume_unknown_field(&header)?,
            }
        }
        Ok(result)
    }
}

#[test]
fn test_self_referential_node() {
    let serializer = Serializer::new(CodecRegistry::builder().build());
    let codec = RcRefCellCodec::new(NodeCodec);

    let node = Rc::new(RefCell::new(Node {
        value: 7,
        next: None,
    }));
    node.borrow_mut().next = Some(node.clone());

    let bytes = serializer.serialize(&codec, &node).unwrap();
    let decoded = serializer.deserialize(&codec, &bytes).unwrap();

    assert_eq!(decoded.borrow().value, 7);
    let next = decoded.borrow().next.clone().unwrap();
    assert!(Rc::ptr_eq(&decoded, &next));
}

#[test]
fn test_two_node_cycle() {
    let serializer = Serializer::new(CodecRegistry::builder().build());
    let codec = RcRefCellCodec::new(NodeCodec);

    let a = Rc::new(RefCell::new(Node {
        value: 1,
        next: None,
    }));
    let b = Rc::new(RefCell::new(Node {
        value: 2,
        next: Some(a.clone()),
    }));
    a.borrow_mut().next = Some(b);

    let bytes = serializer.serialize(&codec, &a).unwrap();
    let decoded_a = serializer.deserialize(&codec, &bytes).unwrap();

    let decoded_b = decoded_a.borrow().next.clone().unwrap();
    assert_eq!(decoded_a.borrow().value, 1);
    assert_eq!(decoded_b.borrow().value, 2);
    let back = decoded_b.borrow().next.clone().unwrap();
    assert!(Rc::ptr_eq(&decoded_a, &back));
}

#[test]
fn test_linear_list_has_no_false_aliasing() {
    let serializer = Serializer::new(CodecRegistry::builder().build());
    let codec = RcRefCellCodec::new(NodeCodec);

    let tail = Rc::new(RefCell::new(Node {
        value: 2,
        next: None,
    }));
    let head = Rc::new(RefCell::new(Node {
        value: 1,
        next: Some(tail),
    }));

    let bytes = serializer.serialize(&codec, &head).unwrap();
    let decoded = serializer.deserialize(&codec, &bytes).unwrap();
    let next = decoded.borrow().next.clone().unwrap();
    assert_eq!(next.borrow().value, 2);
    assert!(next.borrow().next.is_none());
    assert!(!Rc::ptr_eq(&decoded, &next));
}

#[derive(Debug, Default)]
struct Report {
    samples: Vec<i64>,
    label: Option<String>,
    myself: Option<Rc<RefCell<Report>>>,
}

static REPORT_KEY: TypeKey = TypeKey::from_static("report");

struct ReportCodec;

impl ReportCodec {
    fn myself_codec() -> OptionCodec<Rc<RefCell<Report>>, RcRefCellCodec<Report, ReportCodec>> {
        OptionCodec::new(RcRefCellCodec::new(ReportCodec))
    }
}

impl FieldCodec<Report> for ReportCodec {
    fn type_key(&self) -> &TypeKey {
        &REPORT_KEY
    }

    fn write_field(
        &self,
        writer: &mut Writer<'_>,
        field_id_delta: u32,
        expected: Option<&TypeKey>,
        value: &Report,
    ) -> tangle_codec::Result<()> {
        writer.reserve_object_slot();
        writer.write_field_header(field_id_delta, expected, Some(&REPORT_KEY), WireType::TagDelimited);
        let samples = VecCodec::new(I64Codec);
        samples.write_field(writer, 0, Some(samples.type_key()), &value.samples)?;
        OptionCodec::new(StringCodec).write_field(writer, 1, Some(&well_known::STRING), &value.label)?;
        Self::myself_codec().write_field(writer, 1, Some(&REPORT_KEY), &value.myself)?;
        writer.write_end_object();
        Ok(())
    }

    fn read_value(&self, reader: &mut Reader<'_>, field: &Field) -> tangle_codec::Result<Report> {
        assert_eq!(field.wire_type()?, WireType::TagDelimited);
        reader.create_record_placeholder();
        let mut result = Report::default();
        let mut fid = 0u32;
        loop {
            let header = reader.read_field_header()?;
            if header.is_end_object() {
                break;
            }
            fid += header.field_id_delta;
            match fid {
                0 => result.samples = VecCodec::new(I64Codec).read_field(reader, &header)?,
                1 => result.label = OptionCodec::new(StringCodec).read_field(reader, &header)?,
                2 => result.myself = Self::myself_codec().read_field(reader, &header)?,
                _ => reader.consume_unknown_field(&header)?,
            }
        }
        Ok(result)
    }
}

// A record holding varint, boundary and fixed-width magnitudes, a null field, and a
// reference back to itself, all in one payload.
#[test]
fn test_record_with_list_null_and_self_reference() {
    let serializer = Serializer::new(CodecRegistry::builder().build());
    let codec = RcRefCellCodec::new(ReportCodec);

    let report = Rc::new(RefCell::new(Report {
        samples: vec![1, 300, 70_000],
        label: None,
        myself: None,
    }));
    report.borrow_mut().myself = Some(report.clone());

    let bytes = serializer.serialize(&codec, &report).unwrap();
    let decoded = serializer.deserialize(&codec, &bytes).unwrap();

    assert_eq!(decoded.borrow().samples, vec![1, 300, 70_000]);
    assert!(decoded.borrow().label.is_none());
    let myself = decoded.borrow().myself.clone().unwrap();
    assert!(Rc::ptr_eq(&decoded, &myself));
}

#[test]
fn test_option_rc_none_and_back_reference() {
    let serializer = Serializer::new(CodecRegistry::builder().build());
    let codec = VecCodec::new(OptionCodec::new(RcCodec::new(StringCodec)));

    let shared = Rc::new("dup".to_string());
    let value = vec![Some(shared.clone()), None, Some(shared)];
    let bytes = serializer.serialize(&codec, &value).unwrap();
    let decoded = serializer.deserialize(&codec, &bytes).unwrap();

    assert!(decoded[1].is_none());
    let first = decoded[0].clone().unwrap();
    let third = decoded[2].clone().unwrap();
    assert_eq!(*first, "dup");
    assert!(Rc::ptr_eq(&first, &third));
}
