//! Conflict service shared by every write path.

use std::sync::Arc;

use crate::config::{EmptyDiffPolicy, ResolverConfig};
use crate::diff;
use crate::error::{Error, Result};
use crate::models::{
    ConflictId, ConflictRecord, ConflictStatus, MergeSelection, ResolvedEntity, Strategy,
    VersionedSnapshot,
};
use crate::notify::{ConflictObserver, ConflictTransition, ObserverRegistry, SubscriptionId};
use crate::resolve::{ensure_batch_strategy, BatchItem, BatchReport, ResolutionEngine};
use crate::store::{ConflictStore, Detection, InMemoryConflictStore, StoreCounts};

/// Outcome of a write-path version check
#[derive(Debug, Clone)]
pub enum WriteCheck {
    /// The write may proceed
    Clear,
    /// The write was rejected and this conflict now tracks it
    Conflict(ConflictRecord),
}

impl WriteCheck {
    pub const fn is_clear(&self) -> bool {
        matches!(self, Self::Clear)
    }
}

/// Detection, query, and resolution entry points over a conflict store
///
/// All methods take `&self`; the service can be shared across threads behind
/// an `Arc`. Resolutions of one conflict are serialized by the store, while
/// different conflicts resolve in parallel.
pub struct ConflictService<S = InMemoryConflictStore> {
    store: S,
    engine: ResolutionEngine,
    observers: ObserverRegistry,
    config: ResolverConfig,
}

impl ConflictService<InMemoryConflictStore> {
    /// Service over a fresh in-memory store with default config
    pub fn in_memory() -> Self {
        Self::new(InMemoryConflictStore::new())
    }
}

impl<S: ConflictStore> ConflictService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, ResolverConfig::default())
    }

    pub fn with_config(store: S, config: ResolverConfig) -> Self {
        Self {
            store,
            engine: ResolutionEngine::from_config(&config),
            observers: ObserverRegistry::new(),
            config,
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Record a failed version check
    ///
    /// Opens a new conflict, or folds `server` into the record's open conflict
    /// when there already is one, and notifies observers either way.
    pub fn report_conflict(
        &self,
        local: VersionedSnapshot,
        server: VersionedSnapshot,
    ) -> Result<ConflictRecord> {
        self.report_detection(local, server).map(Detection::into_record)
    }

    /// Like [`report_conflict`](Self::report_conflict), telling whether the
    /// conflict was opened, refreshed, or kept because `server` was stale
    ///
    /// Under [`EmptyDiffPolicy::Reject`] snapshots without discrepancies are
    /// refused only when the record has no open conflict; an open one still
    /// takes the newer server snapshot.
    pub fn report_detection(
        &self,
        local: VersionedSnapshot,
        server: VersionedSnapshot,
    ) -> Result<Detection> {
        let conflict = ConflictRecord::detect(local, server)?;

        if conflict.field_diffs().is_empty() {
            match self.config.empty_diff {
                EmptyDiffPolicy::Reject if self.store.find_open(&conflict.key()).is_none() => {
                    return Err(Error::EmptyDiff {
                        entity_table: conflict.entity_table().to_string(),
                        record_id: conflict.record_id().to_string(),
                    });
                }
                EmptyDiffPolicy::Reject => tracing::debug!(
                    "Folding snapshot without discrepancies into open conflict on {}",
                    conflict.key()
                ),
                EmptyDiffPolicy::Warn => tracing::warn!(
                    "Conflict reported for {} although no field differs",
                    conflict.key()
                ),
            }
        }

        let detection = self.store.record_detection(conflict)?;
        match &detection {
            Detection::Created(record) => {
                tracing::info!(
                    "Detected conflict {} on {} ({} fields differ)",
                    record.id(),
                    record.key(),
                    record.field_diffs().len()
                );
                self.observers.notify(ConflictTransition::Detected, record);
            }
            Detection::Refreshed(record) => {
                tracing::info!(
                    "Folded server v{} into open conflict {} on {}",
                    record.server().version,
                    record.id(),
                    record.key()
                );
                self.observers.notify(ConflictTransition::Refreshed, record);
            }
            Detection::Stale(_) => {}
        }
        Ok(detection)
    }

    /// Version check for a write of `local` against the persisted `server`
    ///
    /// Equal versions, or diverged versions that agree on every field, let
    /// the write through. Anything else is reported as a conflict.
    pub fn check_write(
        &self,
        local: VersionedSnapshot,
        server: VersionedSnapshot,
    ) -> Result<WriteCheck> {
        let diffs = diff::diff(&local, &server)?;
        if local.version == server.version {
            return Ok(WriteCheck::Clear);
        }
        if diffs.is_empty() {
            tracing::debug!(
                "Versions of {} diverged (v{} vs v{}) with identical fields",
                local.key(),
                local.version,
                server.version
            );
            return Ok(WriteCheck::Clear);
        }

        self.report_conflict(local, server).map(WriteCheck::Conflict)
    }

    pub fn get(&self, id: &ConflictId) -> Result<ConflictRecord> {
        self.store.get(id)
    }

    pub fn list_by_status(&self, status: ConflictStatus) -> Vec<ConflictRecord> {
        self.store.list_by_status(status)
    }

    pub fn list_unresolved(&self) -> Vec<ConflictRecord> {
        self.list_by_status(ConflictStatus::Unresolved)
    }

    pub fn counts(&self) -> StoreCounts {
        self.store.counts()
    }

    /// Resolve one conflict and return the entity the caller should persist
    pub fn resolve(
        &self,
        id: &ConflictId,
        strategy: Strategy,
        selections: &[MergeSelection],
    ) -> Result<ResolvedEntity> {
        let (resolved, record) = self.store.update(id, |conflict| {
            let resolved = self.engine.resolve(conflict, strategy, selections)?;
            Ok((resolved, conflict.clone()))
        })?;

        self.observers.notify(ConflictTransition::Resolved, &record);
        Ok(resolved)
    }

    /// Resolve the given conflicts with one unconditional strategy
    ///
    /// Items are processed in order and fail independently; an unknown id is
    /// a `NotFound` failure for that item only.
    pub fn resolve_all(&self, ids: &[ConflictId], strategy: Strategy) -> Result<BatchReport> {
        ensure_batch_strategy(strategy)?;

        let items = ids
            .iter()
            .map(|id| BatchItem {
                conflict_id: *id,
                outcome: self.resolve(id, strategy, &[]).into(),
            })
            .collect::<Vec<_>>();

        let report = BatchReport::new(items);
        tracing::info!(
            "Batch {}: {} resolved, {} failed",
            strategy,
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }

    /// Resolve every currently open conflict, oldest first
    pub fn resolve_all_unresolved(&self, strategy: Strategy) -> Result<BatchReport> {
        ensure_batch_strategy(strategy)?;
        let ids = self
            .list_unresolved()
            .iter()
            .map(ConflictRecord::id)
            .collect::<Vec<_>>();
        self.resolve_all(&ids, strategy)
    }

    pub fn subscribe(&self, observer: Arc<dyn ConflictObserver>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}
