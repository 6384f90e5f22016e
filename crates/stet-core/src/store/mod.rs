//! Conflict record storage
//!
//! The store owns the set of detected conflicts and enforces that a record has
//! at most one open conflict at a time. Retention and durability belong to the
//! embedding application; the core never deletes a record.

mod memory;

pub use memory::InMemoryConflictStore;

use serde::Serialize;

use crate::error::Result;
use crate::models::{ConflictId, ConflictRecord, ConflictStatus, EntityKey};

/// What a detection did to the store
#[derive(Debug, Clone)]
pub enum Detection {
    /// A new open conflict was inserted
    Created(ConflictRecord),
    /// The open conflict for the record took the newer server snapshot
    Refreshed(ConflictRecord),
    /// The open conflict already held a newer server snapshot and was kept
    Stale(ConflictRecord),
}

impl Detection {
    pub const fn record(&self) -> &ConflictRecord {
        match self {
            Self::Created(record) | Self::Refreshed(record) | Self::Stale(record) => record,
        }
    }

    pub fn into_record(self) -> ConflictRecord {
        match self {
            Self::Created(record) | Self::Refreshed(record) | Self::Stale(record) => record,
        }
    }
}

/// Number of stored conflicts per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub unresolved: usize,
    pub resolved: usize,
}

impl StoreCounts {
    pub const fn total(&self) -> usize {
        self.unresolved + self.resolved
    }
}

/// Trait for conflict storage operations
///
/// Implementations must be safe under concurrent detection: `add` and
/// `record_detection` perform their duplicate check and insert as one step, and
/// `update` serializes all mutations of a single record.
pub trait ConflictStore: Send + Sync {
    /// Insert a conflict, rejecting a second open conflict for the same record
    fn add(&self, conflict: ConflictRecord) -> Result<ConflictRecord>;

    /// Insert a conflict, or fold its server snapshot into the record's open one
    fn record_detection(&self, conflict: ConflictRecord) -> Result<Detection>;

    /// Get a conflict by ID
    fn get(&self, id: &ConflictId) -> Result<ConflictRecord>;

    /// The open conflict for a record, if any
    fn find_open(&self, key: &EntityKey) -> Option<ConflictRecord>;

    /// Detached copies of every conflict in `status`, oldest detection first
    fn list_by_status(&self, status: ConflictStatus) -> Vec<ConflictRecord>;

    /// Detached copies of every conflict, oldest detection first
    fn all(&self) -> Vec<ConflictRecord>;

    fn counts(&self) -> StoreCounts;

    /// Run `f` against the stored record while holding that record's lock
    ///
    /// Changes made by `f` are discarded when it returns `Err`.
    fn update<R, F>(&self, id: &ConflictId, f: F) -> Result<R>
    where
        F: FnOnce(&mut ConflictRecord) -> Result<R>;
}
