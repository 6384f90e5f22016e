//! Resolver configuration.
//!
//! Provides `ResolverConfig`, the policy knobs shared by every write path that
//! embeds the conflict service. All fields default, so an empty JSON object
//! (or no config file at all) yields the strict behavior.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How a merge treats diffed fields that have no selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeCompleteness {
    /// Every diffed field needs a selection
    #[default]
    Strict,
    /// Unselected diffed fields keep the server value
    FillFromServer,
}

/// What `report_conflict` does with two snapshots that have no discrepancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyDiffPolicy {
    /// Record the conflict and log a warning
    #[default]
    Warn,
    /// Fail with `Error::EmptyDiff`
    Reject,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    #[serde(default)]
    pub merge_completeness: MergeCompleteness,
    #[serde(default)]
    pub empty_diff: EmptyDiffPolicy,
}

impl ResolverConfig {
    /// Parse a config from a raw JSON payload.
    pub fn from_json(payload: &str) -> Result<Self> {
        serde_json::from_str(payload)
            .map_err(|error| Error::Config(format!("invalid resolver config JSON: {error}")))
    }

    /// Load a config file, falling back to defaults when it does not exist.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No resolver config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            Error::Config(format!(
                "failed to read resolver config at {}: {}",
                path.display(),
                error
            ))
        })?;
        Self::from_json(&raw)
    }
}
