//! Conflict state persisted between CLI invocations.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stet_core::{ConflictRecord, ConflictStore, InMemoryConflictStore};

use crate::error::CliError;

const STATE_FILE_NAME: &str = "conflicts.json";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default = "default_state_version")]
    pub version: u32,
    #[serde(default)]
    pub conflicts: Vec<ConflictRecord>,
}

const fn default_state_version() -> u32 {
    1
}

pub fn resolve_state_path(cli_state_path: Option<PathBuf>) -> PathBuf {
    cli_state_path
        .or_else(|| env::var_os("STET_STATE_PATH").map(PathBuf::from))
        .unwrap_or_else(default_state_path)
}

pub fn default_state_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stet")
        .join(STATE_FILE_NAME)
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> PathBuf {
    cli_config_path
        .or_else(|| env::var_os("STET_CONFIG").map(PathBuf::from))
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stet")
        .join(CONFIG_FILE_NAME)
}

/// Load the saved conflicts into a fresh store (empty when the file is missing)
pub fn load_store(path: &Path) -> Result<InMemoryConflictStore, CliError> {
    if !path.exists() {
        return Ok(InMemoryConflictStore::new());
    }

    let raw = std::fs::read_to_string(path)?;
    let document = serde_json::from_str::<StateDocument>(&raw).map_err(|error| {
        CliError::State(format!(
            "Failed to parse state at {}: {}",
            path.display(),
            error
        ))
    })?;

    let count = document.conflicts.len();
    let store = InMemoryConflictStore::from_records(document.conflicts)?;
    tracing::debug!("Loaded {} conflicts from {}", count, path.display());
    Ok(store)
}

pub fn save_store(store: &InMemoryConflictStore, path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let document = StateDocument {
        version: default_state_version(),
        conflicts: store.all(),
    };
    let serialized = serde_json::to_string_pretty(&document)?;
    std::fs::write(path, serialized)?;
    tracing::debug!(
        "Saved {} conflicts to {}",
        document.conflicts.len(),
        path.display()
    );
    Ok(())
}
