//! Versioned snapshot model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Field name to value mapping of one record
///
/// Keys are kept sorted so iteration and serialization are deterministic.
pub type FieldMap = BTreeMap<String, Value>;

/// Identity of a contended record: `(entity_table, record_id)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    /// Logical record type
    pub entity_table: String,
    /// Specific record within the table
    pub record_id: String,
}

impl EntityKey {
    /// Create a key from a table and record identifier
    pub fn new(entity_table: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            entity_table: entity_table.into(),
            record_id: record_id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_table, self.record_id)
    }
}

/// A versioned copy of a record's field values at a point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedSnapshot {
    /// Logical record type
    pub entity_table: String,
    /// Specific record within the table
    pub record_id: String,
    /// Field values; a field missing here is undefined, which differs from `null`
    #[serde(default)]
    pub fields: FieldMap,
    /// Counter assigned at the last successful write
    pub version: u64,
}

impl VersionedSnapshot {
    /// Create an empty snapshot of a record at `version`
    pub fn new(entity_table: impl Into<String>, record_id: impl Into<String>, version: u64) -> Self {
        Self {
            entity_table: entity_table.into(),
            record_id: record_id.into(),
            fields: FieldMap::new(),
            version,
        }
    }

    /// Builder-style field setter
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Identity of the record this snapshot belongs to
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_table.clone(), self.record_id.clone())
    }

    /// Whether both snapshots describe the same record
    pub fn same_entity(&self, other: &Self) -> bool {
        self.entity_table == other.entity_table && self.record_id == other.record_id
    }

    /// Value of a field, `None` when undefined
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_builder() {
        let snapshot = VersionedSnapshot::new("products", "42", 3)
            .with_field("name", "Acme")
            .with_field("price", 10);

        assert_eq!(snapshot.field("name"), Some(&json!("Acme")));
        assert_eq!(snapshot.field("price"), Some(&json!(10)));
        assert_eq!(snapshot.field("missing"), None);
        assert_eq!(snapshot.key(), EntityKey::new("products", "42"));
    }

    #[test]
    fn test_null_field_is_defined() {
        let snapshot = VersionedSnapshot::new("products", "42", 1).with_field("note", Value::Null);
        assert_eq!(snapshot.field("note"), Some(&Value::Null));
    }

    #[test]
    fn test_snapshot_deserializes_without_fields() {
        let snapshot: VersionedSnapshot = serde_json::from_str(
            r#"{"entity_table": "products", "record_id": "42", "version": 7}"#,
        )
        .unwrap();
        assert!(snapshot.fields.is_empty());
        assert_eq!(snapshot.version, 7);
    }

    #[test]
    fn test_entity_key_display() {
        assert_eq!(EntityKey::new("orders", "a-1").to_string(), "orders/a-1");
    }
}
