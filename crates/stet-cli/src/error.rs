use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] stet_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Conflict ID cannot be empty")]
    EmptyConflictId,
    #[error("Conflict not found for id/prefix: {0}")]
    ConflictNotFound(String),
    #[error("{0}")]
    AmbiguousConflictId(String),
    #[error("Invalid --pick '{0}': expected FIELD=local or FIELD=server")]
    InvalidPick(String),
    #[error("Invalid --set '{0}': expected FIELD=JSON")]
    InvalidSet(String),
    #[error("--pick and --set are only valid with --strategy merge")]
    SelectionsWithoutMerge,
    #[error("Failed to read snapshot at {path}: {message}")]
    Snapshot { path: String, message: String },
    #[error("State file error: {0}")]
    State(String),
}
