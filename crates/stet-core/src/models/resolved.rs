//! Resolved entity model

use serde::{Deserialize, Serialize};

use super::conflict::{ConflictId, Strategy};
use super::snapshot::FieldMap;

/// Final field values of a resolved conflict, ready for the write path
///
/// The core never persists this itself. The collaborator writes `fields` with
/// `base_version` as its expected version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    /// Conflict that produced this entity
    pub conflict_id: ConflictId,
    /// Logical record type
    pub entity_table: String,
    /// Specific record within the table
    pub record_id: String,
    /// Field values to persist
    pub fields: FieldMap,
    /// Server snapshot version the result was computed against
    pub base_version: u64,
    /// Strategy that produced the result
    pub strategy: Strategy,
}
