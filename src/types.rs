//! Type identity and the three-strategy type resolver.
//!
//! A [`TypeKey`] names a serializable type on the wire. When a field must carry type
//! information (its runtime type differs from what the reader expects), the writer
//! picks the cheapest available encoding: a well-known numeric id, a session-scoped
//! reference id established earlier in the same operation, or the fully spelled-out
//! name. The first `Encoded` occurrence of a type simultaneously assigns it the next
//! session reference id, and the reader mirrors that assignment on first sight.

use fxhash::FxHashMap;
use smol_str::SmolStr;

/// The identity of a serializable type, as it appears on the wire.
///
/// Keys are short names such as `"i32"` or `"vec<i32>"`. Two codecs agree on a type
/// exactly when their keys are equal; parameterized containers derive their key from
/// their element codecs' keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeKey(SmolStr);

impl TypeKey {
    pub fn new(name: impl AsRef<str>) -> TypeKey {
        TypeKey(SmolStr::new(name.as_ref()))
    }

    pub const fn from_static(name: &'static str) -> TypeKey {
        TypeKey(SmolStr::new_static(name))
    }

    /// Builds the key of a parameterized type, e.g. `vec<i32>` or `map<string,i64>`.
    pub fn parameterized(base: &str, params: &[&TypeKey]) -> TypeKey {
        let mut name = String::with_capacity(base.len() + 2 + params.len() * 8);
        name.push_str(base);
        name.push('<');
        for (i, p) in params.iter().enumerate() {
            if i > 0 {
                name.push(',');
            }
            name.push_str(p.as_str());
        }
        name.push('>');
        TypeKey(SmolStr::new(name))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for TypeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Keys of the well-known types.
pub mod well_known {
    use super::TypeKey;

    pub static BOOL: TypeKey = TypeKey::from_static("bool");
    pub static U8: TypeKey = TypeKey::from_static("u8");
    pub static U16: TypeKey = TypeKey::from_static("u16");
    pub static U32: TypeKey = TypeKey::from_static("u32");
    pub static U64: TypeKey = TypeKey::from_static("u64");
    pub static I8: TypeKey = TypeKey::from_static("i8");
    pub static I16: TypeKey = TypeKey::from_static("i16");
    pub static I32: TypeKey = TypeKey::from_static("i32");
    pub static I64: TypeKey = TypeKey::from_static("i64");
    pub static F32: TypeKey = TypeKey::from_static("f32");
    pub static F64: TypeKey = TypeKey::from_static("f64");
    pub static STRING: TypeKey = TypeKey::from_static("string");
    pub static BYTES: TypeKey = TypeKey::from_static("bytes");
    pub static DURATION: TypeKey = TypeKey::from_static("duration");
}

/// The closed well-known table. The position of a name is its numeric id, which is
/// baked into the wire format on both ends; entries must never be reordered.
const WELL_KNOWN_TABLE: &[&str] = &[
    "bool", "u8", "u16", "u32", "u64", "i8", "i16", "i32", "i64", "f32", "f64", "string",
    "bytes", "duration",
];

pub fn well_known_id(key: &TypeKey) -> Option<u32> {
    WELL_KNOWN_TABLE
        .iter()
        .position(|name| *name == key.as_str())
        .map(|i| i as u32)
}

pub fn well_known_key(id: u32) -> Option<TypeKey> {
    WELL_KNOWN_TABLE
        .get(id as usize)
        .map(|name| TypeKey::from_static(name))
}

/// Write-side table of types already encoded in this session.
#[derive(Default)]
pub struct WriteTypeRefs {
    ids: FxHashMap<TypeKey, u32>,
}

impl WriteTypeRefs {
    pub fn get(&self, key: &TypeKey) -> Option<u32> {
        self.ids.get(key).copied()
    }

    /// Assigns the next sequential reference id to a type being encoded for the
    /// first time in this session.
    pub fn register(&mut self, key: TypeKey) -> u32 {
        let id = self.ids.len() as u32;
        self.ids.insert(key, id);
        id
    }
}

/// Read-side mirror of [`WriteTypeRefs`].
///
/// Registration deduplicates by name: re-parsing a skipped region (deferred
/// reference materialization) re-encounters `Encoded` descriptors that were already
/// registered at skip time, and must not disturb the id sequence.
#[derive(Default)]
pub struct ReadTypeRefs {
    by_id: Vec<TypeKey>,
    by_name: FxHashMap<TypeKey, u32>,
}

impl ReadTypeRefs {
    pub fn get(&self, id: u32) -> Option<TypeKey> {
        self.by_id.get(id as usize).cloned()
    }

    pub fn register(&mut self, key: TypeKey) -> u32 {
        if let Some(id) = self.by_name.get(&key) {
            return *id;
        }
        let id = self.by_id.len() as u32;
        self.by_id.push(key.clone());
        self.by_name.insert(key, id);
        id
    }
}
