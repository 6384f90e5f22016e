//! Notification bridge
//!
//! Observers hear about conflict transitions after the store has been
//! updated. They are called synchronously and must hand off any slow delivery
//! (toasts, desktop notifications, SMS) themselves. An observer that returns an
//! error or panics is logged and skipped; it can never undo or block a
//! transition.

mod channel;

pub use channel::{ChannelObserver, ConflictEvent};

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::models::ConflictRecord;

/// Error type observers report back; logged, never propagated
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

pub type ObserverResult = std::result::Result<(), ObserverError>;

/// Receives conflict state transitions
pub trait ConflictObserver: Send + Sync {
    fn on_conflict_detected(&self, conflict: &ConflictRecord) -> ObserverResult;

    fn on_conflict_resolved(&self, conflict: &ConflictRecord) -> ObserverResult;

    /// An open conflict took a newer server snapshot
    fn on_conflict_refreshed(&self, _conflict: &ConflictRecord) -> ObserverResult {
        Ok(())
    }
}

/// Kind of transition being announced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictTransition {
    Detected,
    Refreshed,
    Resolved,
}

impl ConflictTransition {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Detected => "detected",
            Self::Refreshed => "refreshed",
            Self::Resolved => "resolved",
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Registered observers, notified in subscription order
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<Vec<(SubscriptionId, Arc<dyn ConflictObserver>)>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn ConflictObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, observer));
        id
    }

    /// Returns `false` when `id` was not subscribed
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `transition` to every observer, isolating their failures
    pub fn notify(&self, transition: ConflictTransition, conflict: &ConflictRecord) {
        // Observers run without the registry lock so they may (un)subscribe.
        let observers = self.observers.read().clone();

        for (id, observer) in observers {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match transition {
                ConflictTransition::Detected => observer.on_conflict_detected(conflict),
                ConflictTransition::Refreshed => observer.on_conflict_refreshed(conflict),
                ConflictTransition::Resolved => observer.on_conflict_resolved(conflict),
            }));

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(error)) => tracing::warn!(
                    "Observer {:?} failed on {} of conflict {}: {}",
                    id,
                    transition.as_str(),
                    conflict.id(),
                    error
                ),
                Err(_) => tracing::warn!(
                    "Observer {:?} panicked on {} of conflict {}",
                    id,
                    transition.as_str(),
                    conflict.id()
                ),
            }
        }
    }
}

/// Observer that writes each transition to the `tracing` log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ConflictObserver for TracingObserver {
    fn on_conflict_detected(&self, conflict: &ConflictRecord) -> ObserverResult {
        tracing::info!(
            conflict_id = %conflict.id(),
            record = %conflict.key(),
            fields = conflict.field_diffs().len(),
            "conflict detected"
        );
        Ok(())
    }

    fn on_conflict_resolved(&self, conflict: &ConflictRecord) -> ObserverResult {
        let strategy = conflict
            .resolution()
            .map_or("unknown", |resolution| resolution.strategy.as_str());
        tracing::info!(
            conflict_id = %conflict.id(),
            record = %conflict.key(),
            strategy,
            "conflict resolved"
        );
        Ok(())
    }

    fn on_conflict_refreshed(&self, conflict: &ConflictRecord) -> ObserverResult {
        tracing::info!(
            conflict_id = %conflict.id(),
            record = %conflict.key(),
            server_version = conflict.server().version,
            "conflict refreshed"
        );
        Ok(())
    }
}
