//! Per-operation session state.
//!
//! A session owns the object-reference table, the type-reference table, and a handle
//! to the codec registry. It is created fresh at the start of one serialize or
//! deserialize call tree and discarded at the end; reference-id numbering is only
//! valid within a single linear pass, so sessions must never be reused across
//! operations or shared between threads.

use std::sync::Arc;

use crate::refs::{ReadReferences, WriteReferences};
use crate::registry::CodecRegistry;
use crate::types::{ReadTypeRefs, WriteTypeRefs};

/// State for one serialize operation.
pub struct SerializerSession {
    pub refs: WriteReferences,
    pub types: WriteTypeRefs,
    registry: Arc<CodecRegistry>,
}

impl SerializerSession {
    pub fn new(registry: Arc<CodecRegistry>) -> SerializerSession {
        SerializerSession {
            refs: WriteReferences::default(),
            types: WriteTypeRefs::default(),
            registry,
        }
    }

    pub fn registry(&self) -> Arc<CodecRegistry> {
        self.registry.clone()
    }
}

/// State for one deserialize operation.
pub struct DeserializerSession {
    pub refs: ReadReferences,
    pub types: ReadTypeRefs,
    registry: Arc<CodecRegistry>,
}

impl DeserializerSession {
    pub fn new(registry: Arc<CodecRegistry>) -> DeserializerSession {
        DeserializerSession {
            refs: ReadReferences::default(),
            types: ReadTypeRefs::default(),
            registry,
        }
    }

    pub fn registry(&self) -> Arc<CodecRegistry> {
        self.registry.clone()
    }
}
