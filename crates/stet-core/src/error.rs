//! Error types for stet-core

use thiserror::Error;

use crate::models::{ConflictId, EntityKey, Strategy};

/// Result type alias using stet-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in stet-core operations
///
/// Every variant carries the identifiers a collaborator UI needs to render an
/// actionable message.
#[derive(Error, Debug)]
pub enum Error {
    /// Differ called on snapshots of two different records
    #[error("Mismatched entities: local snapshot is {local}, server snapshot is {server}")]
    MismatchedEntity { local: EntityKey, server: EntityKey },

    /// Resolution attempted on a conflict that is already closed
    #[error("Conflict {conflict_id} is already resolved")]
    AlreadyResolved { conflict_id: ConflictId },

    /// Merge selections do not cover exactly the diffed fields
    #[error(
        "Incomplete merge for conflict {conflict_id}: missing [{}], extra [{}]",
        .missing.join(", "),
        .extra.join(", ")
    )]
    IncompleteMerge {
        conflict_id: ConflictId,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    /// More than one merge selection for the same field
    #[error("Conflict {conflict_id}: field '{field}' was selected more than once")]
    DuplicateSelection { conflict_id: ConflictId, field: String },

    /// Strategy that cannot be applied uniformly across a batch
    #[error("Strategy '{strategy}' cannot be used for batch resolution")]
    UnsupportedBatchStrategy { strategy: Strategy },

    /// A second open conflict for a record that already has one
    #[error("Record {entity_table}/{record_id} already has open conflict {existing}")]
    DuplicateOpenConflict {
        entity_table: String,
        record_id: String,
        existing: ConflictId,
    },

    /// Conflict id unknown to the store
    #[error("Conflict not found: {0}")]
    NotFound(ConflictId),

    /// Conflict reported for two snapshots with identical fields
    #[error("Snapshots of {entity_table}/{record_id} have no field discrepancies")]
    EmptyDiff {
        entity_table: String,
        record_id: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the caller can recover by re-fetching state or resupplying input.
    ///
    /// `MismatchedEntity` is a programming error in the caller and is the only
    /// domain error that is not recoverable.
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::MismatchedEntity { .. } | Self::Config(_) | Self::Serialization(_)
        )
    }

    /// Conflict the error refers to, when there is one.
    pub const fn conflict_id(&self) -> Option<ConflictId> {
        match self {
            Self::AlreadyResolved { conflict_id }
            | Self::IncompleteMerge { conflict_id, .. }
            | Self::DuplicateSelection { conflict_id, .. }
            | Self::DuplicateOpenConflict {
                existing: conflict_id,
                ..
            }
            | Self::NotFound(conflict_id) => Some(*conflict_id),
            _ => None,
        }
    }
}
