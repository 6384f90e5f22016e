//! Channel-backed observer for asynchronous delivery.

use serde::Serialize;
use tokio::sync::mpsc;

use super::{ConflictObserver, ConflictTransition, ObserverResult};
use crate::models::ConflictRecord;

/// A transition plus the conflict state right after it
#[derive(Debug, Clone, Serialize)]
pub struct ConflictEvent {
    pub transition: ConflictTransition,
    pub conflict: ConflictRecord,
}

/// Forwards transitions into an unbounded tokio channel
///
/// Sending never blocks, so the resolving thread is not held up by whatever
/// drains the receiver.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<ConflictEvent>,
}

impl ChannelObserver {
    pub const fn new(sender: mpsc::UnboundedSender<ConflictEvent>) -> Self {
        Self { sender }
    }

    /// Observer and the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ConflictEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }

    fn forward(&self, transition: ConflictTransition, conflict: &ConflictRecord) -> ObserverResult {
        self.sender
            .send(ConflictEvent {
                transition,
                conflict: conflict.clone(),
            })
            .map_err(|_| "notification channel closed".into())
    }
}

impl ConflictObserver for ChannelObserver {
    fn on_conflict_detected(&self, conflict: &ConflictRecord) -> ObserverResult {
        self.forward(ConflictTransition::Detected, conflict)
    }

    fn on_conflict_resolved(&self, conflict: &ConflictRecord) -> ObserverResult {
        self.forward(ConflictTransition::Resolved, conflict)
    }

    fn on_conflict_refreshed(&self, conflict: &ConflictRecord) -> ObserverResult {
        self.forward(ConflictTransition::Refreshed, conflict)
    }
}
