//! # tangle-codec
//!
//! A self-describing binary serialization protocol for object graphs.
//!
//! - Tagged fields with delta-encoded field ids for forward/backward compatibility
//! - Aliasing preservation and cycle support via a per-operation reference table
//! - Three-strategy type identity encoding (well-known / session-referenced / encoded)
//! - Composable per-type codecs: containers, tuples, options and surrogate-backed
//!   types are built from element codecs injected at construction
//! - Cycle-safe deep copying of in-memory graphs without touching the wire format
//!
//! ## Wire format
//!
//! Every field starts with a single tag byte: bits 0–2 hold the [`WireType`], bits
//! 3–4 the [`SchemaType`], and bits 5–7 an embedded field-id delta (the all-ones
//! pattern means the real delta follows as a varint). Field ids are encoded as deltas
//! from the previous field within the same object, so sequential-field objects cost
//! one byte of framing per field. Varints are little-endian 7-bit groups with a
//! continuation bit; signed values are zig-zag transformed first.
//!
//! Every field is self-terminating: a reader that does not understand a field can
//! still skip it using the wire type alone, and skipped fields remain resolvable if a
//! later reference points at them.
//!
//! ## Usage
//!
//! ```rust
//! use tangle_codec::codecs::containers::VecCodec;
//! use tangle_codec::codecs::primitives::I32Codec;
//! use tangle_codec::registry::CodecRegistry;
//! use tangle_codec::serializer::Serializer;
//!
//! let serializer = Serializer::new(CodecRegistry::builder().build());
//! let codec = VecCodec::new(I32Codec);
//! let bytes = serializer.serialize(&codec, &vec![1, 300, 70_000]).unwrap();
//! let back: Vec<i32> = serializer.deserialize(&codec, &bytes).unwrap();
//! assert_eq!(back, vec![1, 300, 70_000]);
//! ```
//!
//! [`WireType`]: wire::WireType
//! [`SchemaType`]: wire::SchemaType

pub mod codecs;
pub mod copy;
pub mod reader;
pub mod refs;
pub mod registry;
pub mod serializer;
pub mod session;
pub mod types;
pub mod varint;
pub mod wire;
pub mod writer;

pub use codecs::FieldCodec;
pub use copy::{CopyContext, DeepCopier};
pub use reader::Reader;
pub use registry::{AnyCodec, CodecRegistry, DynValue};
pub use serializer::Serializer;
pub use types::TypeKey;
pub use wire::{Field, SchemaType, WireType};
pub use writer::Writer;

/// Errors raised while encoding, decoding, or copying.
///
/// Every fault is unrecoverable for the field that produced it and surfaces
/// synchronously to the caller; the core never substitutes default values for
/// malformed input. The one sanctioned local recovery is skipping a field whose *id*
/// is unknown to the reading schema, which is not an error.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The input ended before the value was complete.
    #[error("insufficient data in input buffer")]
    InsufficientData,
    /// A tag byte carried a wire-type pattern that is not defined.
    #[error("invalid tag byte 0x{0:02x}")]
    InvalidTag(u8),
    /// A field arrived with a wire type the codec cannot interpret.
    #[error("unexpected wire type {actual:?} while reading {reading}")]
    UnexpectedWireType {
        actual: wire::WireType,
        reading: &'static str,
    },
    /// A declared collection length exceeded the remaining input.
    #[error("declared collection length {declared} exceeds remaining input of {remaining} bytes")]
    CollectionTooLarge { declared: u64, remaining: u64 },
    /// A framing field (e.g. a collection's length) was missing before dependent fields.
    #[error("required field missing: {0}")]
    RequiredFieldMissing(&'static str),
    /// A reference id had no entry in the reference table.
    #[error("reference {0} not found in the reference table")]
    ReferenceNotFound(u32),
    /// A reference resolved to an object of an incompatible type.
    #[error("reference {0} resolved to an object of an unexpected type")]
    ReferenceTypeMismatch(u32),
    /// A well-known type id was absent from the local well-known table.
    #[error("unknown well-known type id {0}")]
    UnknownWellKnownType(u32),
    /// A session-referenced type id had no prior encoded occurrence.
    #[error("referenced type {0} was not previously encoded in this session")]
    TypeReferenceNotFound(u32),
    /// Type information was entirely absent where it was required.
    #[error("no type information present where required")]
    TypeMissing,
    /// An encoded type name was not valid UTF-8.
    #[error("encoded type name is not valid UTF-8")]
    InvalidTypeName,
    /// A string payload was not valid UTF-8.
    #[error("invalid UTF-8 in string payload: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    /// No codec is registered for the given type.
    #[error("no codec registered for type {0}")]
    CodecNotFound(types::TypeKey),
    /// No codec is registered for the runtime type of a dynamically dispatched value.
    #[error("no codec registered for the runtime type of the value")]
    CodecNotFoundForValue,
    /// No copier is registered for the runtime type of a dynamically dispatched value.
    #[error("no copier registered for the runtime type of the value")]
    CopierNotFoundForValue,
    /// A previously recorded copy resolved to an object of an incompatible type.
    #[error("a recorded copy resolved to an object of an unexpected type")]
    CopyTypeMismatch,
    /// A codec or copier was invoked with a value whose runtime type it does not support.
    #[error("codec for {expected} invoked with a value of an unsupported runtime type")]
    UnsupportedShape { expected: types::TypeKey },
    /// A varint ran past its maximum width without terminating.
    #[error("malformed variable-length integer")]
    MalformedVarInt,
    /// An integer payload did not fit the destination width.
    #[error("integer value out of range for {reading}")]
    IntegerOutOfRange { reading: &'static str },
}

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, CodecError>;
