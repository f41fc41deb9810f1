//! Per-operation reference tables.
//!
//! Every field consumes exactly one reference-id slot, on both the write and the
//! read side, in strictly increasing order of first occurrence. Value fields consume
//! their slot without recording anything; trackable objects (reference-counted
//! values, skipped unknown fields) are additionally recorded at the slot they
//! consumed. This single-pass determinism is what lets a `Reference` field carry
//! nothing but the numeric id.
//!
//! Ids are 1-based; 0 is reserved to mean null.

use std::any::Any;
use std::rc::Rc;

use fxhash::FxHashMap;

use crate::wire::Field;

/// Write-side identity of a trackable object: the `Rc` allocation address.
pub type ObjectIdentity = usize;

/// Records a field the reader could not interpret, so that a later reference to the
/// same slot can materialize it by re-entering the stream.
#[derive(Debug, Clone)]
pub struct UnknownFieldMarker {
    /// The decoded header of the skipped field.
    pub field: Field,
    /// Byte offset of the field's payload (just past the header).
    pub offset: usize,
    /// The reference id the field consumed when it was skipped.
    pub reference_id: u32,
}

/// Write-side reference table: object identity to assigned id.
#[derive(Default)]
pub struct WriteReferences {
    current_id: u32,
    by_identity: FxHashMap<ObjectIdentity, u32>,
    pending: Option<ObjectIdentity>,
}

impl WriteReferences {
    /// The id a previously recorded object was assigned, if any.
    pub fn get(&self, identity: ObjectIdentity) -> Option<u32> {
        self.by_identity.get(&identity).copied()
    }

    /// Consumes the next id slot. If an identity is pending, it is bound to the
    /// consumed slot; this is how an `Rc` wrapper associates its allocation with the
    /// slot its inner codec is about to consume.
    pub fn consume_slot(&mut self) -> u32 {
        self.current_id += 1;
        if let Some(identity) = self.pending.take() {
            self.by_identity.insert(identity, self.current_id);
        }
        self.current_id
    }

    /// Marks that the next consumed slot belongs to the given object.
    pub fn set_pending(&mut self, identity: ObjectIdentity) {
        self.pending = Some(identity);
    }

    pub fn current_id(&self) -> u32 {
        self.current_id
    }
}

/// One read-side reference table entry.
#[derive(Clone)]
pub enum ReferenceEntry {
    /// A fully materialized object.
    Value(Rc<dyn Any>),
    /// A skipped field awaiting on-demand materialization.
    Unresolved(UnknownFieldMarker),
}

/// Read-side reference table: assigned id to object.
#[derive(Default)]
pub struct ReadReferences {
    current_id: u32,
    entries: FxHashMap<u32, ReferenceEntry>,
    pending: Option<Rc<dyn Any>>,
}

impl ReadReferences {
    pub fn get(&self, id: u32) -> Option<ReferenceEntry> {
        self.entries.get(&id).cloned()
    }

    /// Consumes the next id slot, binding a pending object if one was staged.
    ///
    /// Staging is what makes cyclic graphs representable: an `Rc<RefCell<_>>`
    /// destination is constructed with default contents and staged *before* its
    /// payload is parsed, so nested references to the same slot resolve to the same
    /// allocation while it is still under construction.
    pub fn consume_slot(&mut self) -> u32 {
        self.current_id += 1;
        if let Some(value) = self.pending.take() {
            self.entries.insert(self.current_id, ReferenceEntry::Value(value));
        }
        self.current_id
    }

    /// Stages an object to be recorded at the next consumed slot.
    pub fn set_pending(&mut self, value: Rc<dyn Any>) {
        self.pending = Some(value);
    }

    /// Records (or patches) the object stored at `id`.
    pub fn record(&mut self, id: u32, value: Rc<dyn Any>) {
        self.entries.insert(id, ReferenceEntry::Value(value));
    }

    /// Records a skipped field at the slot it consumed.
    pub fn record_unresolved(&mut self, marker: UnknownFieldMarker) {
        self.entries
            .insert(marker.reference_id, ReferenceEntry::Unresolved(marker));
    }

    pub fn current_id(&self) -> u32 {
        self.current_id
    }

    /// Rewinds the id counter, used around deferred materialization of a skipped
    /// field so nested slots land on the same ids they would have in original order.
    pub fn rewind_to(&mut self, id: u32) {
        self.current_id = id;
    }
}
