//! Batch resolution
//!
//! Applies one unconditional strategy to many conflicts. Each conflict is its
//! own unit of atomicity: a failure on one item is reported and the rest are
//! still processed.

use super::ResolutionEngine;
use crate::error::{Error, Result};
use crate::models::{ConflictId, ConflictRecord, ResolvedEntity, Strategy};

/// Outcome of resolving one conflict in a batch
#[derive(Debug)]
pub enum BatchOutcome {
    Success(ResolvedEntity),
    Failure(Error),
}

impl BatchOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub const fn resolved(&self) -> Option<&ResolvedEntity> {
        match self {
            Self::Success(resolved) => Some(resolved),
            Self::Failure(_) => None,
        }
    }

    pub const fn error(&self) -> Option<&Error> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }
}

impl From<Result<ResolvedEntity>> for BatchOutcome {
    fn from(result: Result<ResolvedEntity>) -> Self {
        match result {
            Ok(resolved) => Self::Success(resolved),
            Err(error) => Self::Failure(error),
        }
    }
}

/// One entry of a batch result, in input order
#[derive(Debug)]
pub struct BatchItem {
    pub conflict_id: ConflictId,
    pub outcome: BatchOutcome,
}

/// Per-item results of a batch resolution
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub const fn new(items: Vec<BatchItem>) -> Self {
        Self { items }
    }

    pub fn succeeded(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.outcome.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    /// Entities the caller should now persist
    pub fn resolved_entities(&self) -> impl Iterator<Item = &ResolvedEntity> {
        self.items.iter().filter_map(|item| item.outcome.resolved())
    }
}

/// Reject strategies that need per-conflict input
pub fn ensure_batch_strategy(strategy: Strategy) -> Result<()> {
    if strategy.is_unconditional() {
        Ok(())
    } else {
        Err(Error::UnsupportedBatchStrategy { strategy })
    }
}

impl ResolutionEngine {
    /// Resolve every conflict with `strategy`, in input order
    ///
    /// Fails up front, before any conflict is touched, when `strategy` is
    /// [`Strategy::Merge`].
    pub fn resolve_all<'a, I>(&self, conflicts: I, strategy: Strategy) -> Result<BatchReport>
    where
        I: IntoIterator<Item = &'a mut ConflictRecord>,
    {
        ensure_batch_strategy(strategy)?;

        let items = conflicts
            .into_iter()
            .map(|conflict| BatchItem {
                conflict_id: conflict.id(),
                outcome: self.resolve(conflict, strategy, &[]).into(),
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
}
