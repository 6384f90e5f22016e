//! In-memory conflict store
//!
//! An arena of records keyed by conflict id. Each record sits behind its own
//! mutex; the index lock only guards the id and open-record maps.
//!
//! Lock order is index, then record. `update` never holds a record lock while
//! taking the index lock.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::{ConflictStore, Detection, StoreCounts};
use crate::error::{Error, Result};
use crate::models::{ConflictId, ConflictRecord, ConflictStatus, EntityKey};

type SharedRecord = Arc<Mutex<ConflictRecord>>;

struct Slot {
    /// Insertion order, breaks ties between equal detection timestamps
    seq: u64,
    record: SharedRecord,
}

#[derive(Default)]
struct Index {
    slots: HashMap<ConflictId, Slot>,
    /// Record identity to its open conflict. May briefly point at a record
    /// that was just resolved; readers re-check the status under the record
    /// lock.
    open: HashMap<EntityKey, ConflictId>,
    next_seq: u64,
}

impl Index {
    fn open_record(&self, key: &EntityKey) -> Option<SharedRecord> {
        let id = self.open.get(key)?;
        self.slots.get(id).map(|slot| Arc::clone(&slot.record))
    }

    fn insert(&mut self, conflict: ConflictRecord) -> Result<ConflictRecord> {
        let id = conflict.id();
        if self.slots.contains_key(&id) {
            return Err(Error::InvalidInput(format!(
                "conflict {id} is already stored"
            )));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        if !conflict.is_resolved() {
            self.open.insert(conflict.key(), id);
        }

        let stored = conflict.clone();
        self.slots.insert(
            id,
            Slot {
                seq,
                record: Arc::new(Mutex::new(conflict)),
            },
        );
        Ok(stored)
    }

    fn sorted(&self, status: Option<ConflictStatus>) -> Vec<ConflictRecord> {
        let mut rows = self
            .slots
            .values()
            .filter_map(|slot| {
                let record = slot.record.lock();
                if status.is_some_and(|status| record.status() != status) {
                    return None;
                }
                Some((record.detected_at(), slot.seq, record.clone()))
            })
            .collect::<Vec<_>>();

        rows.sort_by_key(|(detected_at, seq, _)| (*detected_at, *seq));
        rows.into_iter().map(|(_, _, record)| record).collect()
    }
}

/// Thread-safe in-memory implementation of `ConflictStore`
#[derive(Default)]
pub struct InMemoryConflictStore {
    index: RwLock<Index>,
}

impl InMemoryConflictStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from previously saved records
    ///
    /// Fails when two open records share an identity or an id repeats.
    pub fn from_records(records: impl IntoIterator<Item = ConflictRecord>) -> Result<Self> {
        let store = Self::new();
        for record in records {
            store.add(record)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.index.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, id: &ConflictId) -> Result<SharedRecord> {
        self.index
            .read()
            .slots
            .get(id)
            .map(|slot| Arc::clone(&slot.record))
            .ok_or(Error::NotFound(*id))
    }
}

impl ConflictStore for InMemoryConflictStore {
    fn add(&self, conflict: ConflictRecord) -> Result<ConflictRecord> {
        let mut index = self.index.write();

        if !conflict.is_resolved() {
            if let Some(shared) = index.open_record(&conflict.key()) {
                let existing = shared.lock();
                if !existing.is_resolved() {
                    return Err(Error::DuplicateOpenConflict {
                        entity_table: conflict.entity_table().to_string(),
                        record_id: conflict.record_id().to_string(),
                        existing: existing.id(),
                    });
                }
            }
        }

        let stored = index.insert(conflict)?;
        tracing::debug!("Stored conflict {} for {}", stored.id(), stored.key());
        Ok(stored)
    }

    fn record_detection(&self, conflict: ConflictRecord) -> Result<Detection> {
        let mut index = self.index.write();

        if let Some(shared) = index.open_record(&conflict.key()) {
            let mut existing = shared.lock();
            if !existing.is_resolved() {
                let held_version = existing.server().version;
                if existing.refresh_server(conflict.server().clone()) {
                    return Ok(Detection::Refreshed(existing.clone()));
                }
                tracing::warn!(
                    "Ignoring server snapshot v{} for {}: open conflict {} already holds v{}",
                    conflict.server().version,
                    existing.key(),
                    existing.id(),
                    held_version
                );
                return Ok(Detection::Stale(existing.clone()));
            }
        }

        index.insert(conflict).map(Detection::Created)
    }

    fn get(&self, id: &ConflictId) -> Result<ConflictRecord> {
        let shared = self.slot(id)?;
        let record = shared.lock().clone();
        Ok(record)
    }

    fn find_open(&self, key: &EntityKey) -> Option<ConflictRecord> {
        let shared = self.index.read().open_record(key)?;
        let record = shared.lock();
        (!record.is_resolved()).then(|| record.clone())
    }

    fn list_by_status(&self, status: ConflictStatus) -> Vec<ConflictRecord> {
        self.index.read().sorted(Some(status))
    }

    fn all(&self) -> Vec<ConflictRecord> {
        self.index.read().sorted(None)
    }

    fn counts(&self) -> StoreCounts {
        let index = self.index.read();
        index
            .slots
            .values()
            .fold(StoreCounts::default(), |mut counts, slot| {
                match slot.record.lock().status() {
                    ConflictStatus::Unresolved => counts.unresolved += 1,
                    ConflictStatus::Resolved => counts.resolved += 1,
                }
                counts
            })
    }

    fn update<R, F>(&self, id: &ConflictId, f: F) -> Result<R>
    where
        F: FnOnce(&mut ConflictRecord) -> Result<R>,
    {
        let shared = self.slot(id)?;

        let (result, closed_key) = {
            let mut record = shared.lock();
            let was_open = !record.is_resolved();
            let before = record.clone();
            match f(&mut record) {
                Ok(value) => {
                    let closed = (was_open && record.is_resolved()).then(|| record.key());
                    (Ok(value), closed)
                }
                Err(error) => {
                    *record = before;
                    (Err(error), None)
                }
            }
        };

        if let Some(key) = closed_key {
            let mut index = self.index.write();
            if index.open.get(&key) == Some(id) {
                index.open.remove(&key);
            }
        }

        result
    }
}
