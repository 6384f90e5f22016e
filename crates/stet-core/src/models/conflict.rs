//! Conflict record model

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use uuid::Uuid;

use super::snapshot::{EntityKey, FieldMap, VersionedSnapshot};
use crate::diff::{self, FieldDiscrepancy};
use crate::error::{Error, Result};
use crate::util::now_ms;

/// A unique identifier for a conflict, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConflictId(Uuid);

impl ConflictId {
    /// Create a new unique conflict ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ConflictId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConflictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConflictId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle state of a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStatus {
    Unresolved,
    Resolved,
}

impl ConflictStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Resolved => "resolved",
        }
    }
}

impl fmt::Display for ConflictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unresolved" | "open" => Ok(Self::Unresolved),
            "resolved" | "closed" => Ok(Self::Resolved),
            other => Err(Error::InvalidInput(format!("unknown conflict status '{other}'"))),
        }
    }
}

/// Rule used to produce the final value set of a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Keep the initiating actor's fields
    LocalWins,
    /// Keep the persisted fields
    ServerWins,
    /// Field-by-field selection over the server baseline
    Merge,
}

impl Strategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalWins => "local_wins",
            Self::ServerWins => "server_wins",
            Self::Merge => "merge",
        }
    }

    /// Whether the strategy needs no per-field input
    pub const fn is_unconditional(self) -> bool {
        matches!(self, Self::LocalWins | Self::ServerWins)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "local" | "local_wins" => Ok(Self::LocalWins),
            "server" | "server_wins" => Ok(Self::ServerWins),
            "merge" => Ok(Self::Merge),
            other => Err(Error::InvalidInput(format!("unknown strategy '{other}'"))),
        }
    }
}

/// Audit entry written when a conflict is resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Strategy that produced the result
    pub strategy: Strategy,
    /// Final field values handed back to the write path
    pub merged_fields: FieldMap,
    /// Resolution timestamp (Unix ms)
    pub resolved_at: i64,
}

/// A detected divergence between a locally held and a persisted snapshot
///
/// Records are only ever moved forward: the server snapshot may be refreshed
/// while the conflict is open, and the conflict may be resolved once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StoredConflict")]
pub struct ConflictRecord {
    id: ConflictId,
    local: VersionedSnapshot,
    server: VersionedSnapshot,
    detected_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refreshed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resolution: Option<Resolution>,
    #[serde(skip)]
    field_diffs: OnceLock<BTreeSet<String>>,
}

impl ConflictRecord {
    /// Build an open conflict for two snapshots of the same record
    ///
    /// Assigns a fresh id and the detection timestamp.
    pub fn detect(local: VersionedSnapshot, server: VersionedSnapshot) -> Result<Self> {
        diff::ensure_same_entity(&local, &server)?;
        Ok(Self {
            id: ConflictId::new(),
            local,
            server,
            detected_at: now_ms(),
            refreshed_at: None,
            resolution: None,
            field_diffs: OnceLock::new(),
        })
    }

    /// Override the generated id (collaborators restoring known conflicts)
    #[must_use]
    pub fn with_id(mut self, id: ConflictId) -> Self {
        self.id = id;
        self
    }

    /// Override the detection timestamp (Unix ms)
    #[must_use]
    pub fn with_detected_at(mut self, detected_at: i64) -> Self {
        self.detected_at = detected_at;
        self
    }

    pub const fn id(&self) -> ConflictId {
        self.id
    }

    pub const fn local(&self) -> &VersionedSnapshot {
        &self.local
    }

    pub const fn server(&self) -> &VersionedSnapshot {
        &self.server
    }

    pub fn entity_table(&self) -> &str {
        &self.local.entity_table
    }

    pub fn record_id(&self) -> &str {
        &self.local.record_id
    }

    pub fn key(&self) -> EntityKey {
        self.local.key()
    }

    /// Detection timestamp (Unix ms)
    pub const fn detected_at(&self) -> i64 {
        self.detected_at
    }

    /// Timestamp of the last server snapshot refresh (Unix ms)
    pub const fn refreshed_at(&self) -> Option<i64> {
        self.refreshed_at
    }

    pub const fn resolution(&self) -> Option<&Resolution> {
        self.resolution.as_ref()
    }

    pub const fn status(&self) -> ConflictStatus {
        if self.resolution.is_some() {
            ConflictStatus::Resolved
        } else {
            ConflictStatus::Unresolved
        }
    }

    pub const fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Names of the fields whose local and server values differ
    ///
    /// Computed on first access and cached until the server snapshot changes.
    pub fn field_diffs(&self) -> &BTreeSet<String> {
        self.field_diffs
            .get_or_init(|| diff::diff_fields(&self.local, &self.server))
    }

    /// Both sides' values for every diffed field
    pub fn discrepancies(&self) -> Vec<FieldDiscrepancy> {
        self.field_diffs()
            .iter()
            .map(|field| FieldDiscrepancy {
                field: field.clone(),
                local: self.local.field(field).cloned(),
                server: self.server.field(field).cloned(),
            })
            .collect()
    }

    /// Fold a newer server snapshot into this open conflict
    ///
    /// Returns `false` and leaves the record untouched when the conflict is
    /// resolved, the snapshot belongs to another record, or it is older than
    /// the one already held.
    pub(crate) fn refresh_server(&mut self, server: VersionedSnapshot) -> bool {
        if self.is_resolved() || !self.server.same_entity(&server) {
            return false;
        }
        if server.version < self.server.version {
            return false;
        }

        self.server = server;
        self.refreshed_at = Some(now_ms());
        self.field_diffs = OnceLock::new();
        true
    }

    pub(crate) fn mark_resolved(&mut self, resolution: Resolution) {
        debug_assert!(self.resolution.is_none(), "conflict resolved twice");
        self.resolution = Some(resolution);
    }
}

/// Serialized shape of a conflict, validated on the way in
#[derive(Deserialize)]
struct StoredConflict {
    id: ConflictId,
    local: VersionedSnapshot,
    server: VersionedSnapshot,
    detected_at: i64,
    #[serde(default)]
    refreshed_at: Option<i64>,
    #[serde(default)]
    resolution: Option<Resolution>,
}

impl TryFrom<StoredConflict> for ConflictRecord {
    type Error = Error;

    fn try_from(stored: StoredConflict) -> Result<Self> {
        diff::ensure_same_entity(&stored.local, &stored.server)?;
        Ok(Self {
            id: stored.id,
            local: stored.local,
            server: stored.server,
            detected_at: stored.detected_at,
            refreshed_at: stored.refreshed_at,
            resolution: stored.resolution,
            field_diffs: OnceLock::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn acme_conflict() -> ConflictRecord {
        let local = VersionedSnapshot::new("products", "42", 1)
            .with_field("name", "Acme")
            .with_field("price", 10);
        let server = VersionedSnapshot::new("products", "42", 2)
            .with_field("name", "Acme Corp")
            .with_field("price", 10);
        ConflictRecord::detect(local, server).unwrap()
    }

    #[test]
    fn test_conflict_id_unique() {
        assert_ne!(ConflictId::new(), ConflictId::new());
    }

    #[test]
    fn test_conflict_id_parse() {
        let id = ConflictId::new();
        let parsed: ConflictId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_detect_starts_unresolved() {
        let conflict = acme_conflict();
        assert_eq!(conflict.status(), ConflictStatus::Unresolved);
        assert!(conflict.resolution().is_none());
        assert!(conflict.detected_at() > 0);
        assert_eq!(conflict.entity_table(), "products");
        assert_eq!(conflict.record_id(), "42");
    }

    #[test]
    fn test_detect_rejects_mismatched_records() {
        let local = VersionedSnapshot::new("products", "42", 1);
        let server = VersionedSnapshot::new("products", "43", 2);
        let error = ConflictRecord::detect(local, server).unwrap_err();
        assert!(matches!(error, Error::MismatchedEntity { .. }));
    }

    #[test]
    fn test_field_diffs_are_cached_until_refresh() {
        let mut conflict = acme_conflict();
        assert_eq!(
            conflict.field_diffs().iter().collect::<Vec<_>>(),
            vec!["name"]
        );

        let newer = VersionedSnapshot::new("products", "42", 3)
            .with_field("name", "Acme Corp")
            .with_field("price", 12);
        assert!(conflict.refresh_server(newer));
        assert_eq!(
            conflict.field_diffs().iter().collect::<Vec<_>>(),
            vec!["name", "price"]
        );
        assert!(conflict.refreshed_at().is_some());
    }

    #[test]
    fn test_refresh_ignores_older_server_snapshot() {
        let mut conflict = acme_conflict();
        let older = VersionedSnapshot::new("products", "42", 1).with_field("name", "Old");
        assert!(!conflict.refresh_server(older));
        assert_eq!(conflict.server().field("name"), Some(&json!("Acme Corp")));
    }

    #[test]
    fn test_discrepancies_show_both_sides() {
        let conflict = acme_conflict();
        let discrepancies = conflict.discrepancies();
        assert_eq!(discrepancies.len(), 1);
        assert_eq!(discrepancies[0].field, "name");
        assert_eq!(discrepancies[0].local, Some(json!("Acme")));
        assert_eq!(discrepancies[0].server, Some(json!("Acme Corp")));
    }

    #[test]
    fn test_strategy_and_status_parse() {
        assert_eq!("local".parse::<Strategy>().unwrap(), Strategy::LocalWins);
        assert_eq!("server-wins".parse::<Strategy>().unwrap(), Strategy::ServerWins);
        assert_eq!("MERGE".parse::<Strategy>().unwrap(), Strategy::Merge);
        assert!("newest".parse::<Strategy>().is_err());
        assert_eq!(
            "resolved".parse::<ConflictStatus>().unwrap(),
            ConflictStatus::Resolved
        );
    }

    #[test]
    fn test_record_roundtrips_through_json() {
        let conflict = acme_conflict();
        let json = serde_json::to_string(&conflict).unwrap();
        assert!(!json.contains("field_diffs"));

        let restored: ConflictRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.id(), conflict.id());
        assert_eq!(restored.field_diffs(), conflict.field_diffs());
    }

    #[test]
    fn test_stored_conflict_with_mismatched_snapshots_is_rejected() {
        let payload = json!({
            "id": ConflictId::new(),
            "local": {"entity_table": "products", "record_id": "1", "version": 1},
            "server": {"entity_table": "orders", "record_id": "1", "version": 2},
            "detected_at": 1
        });
        assert!(serde_json::from_value::<ConflictRecord>(payload).is_err());
    }
}
