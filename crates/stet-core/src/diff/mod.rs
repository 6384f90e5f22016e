//! Field differ
//!
//! Computes which fields of two snapshots of the same record disagree. Scalars
//! compare strictly: no coercion between types, but numbers compare by value,
//! so `10` equals `10.0`. Arrays compare element-wise and objects key-wise with
//! the same rule. A field that is present on only one side is always a
//! discrepancy, even against `null`.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::models::VersionedSnapshot;

/// One diffed field with both sides' values (`None` means undefined)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDiscrepancy {
    pub field: String,
    pub local: Option<Value>,
    pub server: Option<Value>,
}

/// Names of the fields whose values differ between `local` and `server`
///
/// Fails with [`Error::MismatchedEntity`] when the snapshots describe
/// different records. An empty set is a valid result.
pub fn diff(local: &VersionedSnapshot, server: &VersionedSnapshot) -> Result<BTreeSet<String>> {
    ensure_same_entity(local, server)?;
    let fields = diff_fields(local, server);
    tracing::debug!(
        "Diffed {}/{}: {} of {} fields differ",
        local.entity_table,
        local.record_id,
        fields.len(),
        local.fields.len().max(server.fields.len())
    );
    Ok(fields)
}

/// Like [`diff`], with the values on each side
pub fn discrepancies(
    local: &VersionedSnapshot,
    server: &VersionedSnapshot,
) -> Result<Vec<FieldDiscrepancy>> {
    Ok(diff(local, server)?
        .into_iter()
        .map(|field| FieldDiscrepancy {
            local: local.field(&field).cloned(),
            server: server.field(&field).cloned(),
            field,
        })
        .collect())
}

/// Canonical string form of a value
///
/// Object keys come out sorted, so two structurally equal values always render
/// identically. Numbers keep their written form (`10` and `10.0` render
/// differently while [`values_equal`] treats them as equal). Collaborators that
/// store composite fields as text should store this form.
pub fn canonicalize(value: &Value) -> String {
    value.to_string()
}

/// Strict equality of two field values
///
/// Different JSON types never compare equal. Numbers compare by numeric value.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => numbers_equal(left, right),
        (Value::Array(left), Value::Array(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .zip(right)
                    .all(|(left, right)| values_equal(left, right))
        }
        (Value::Object(left), Value::Object(right)) => {
            left.len() == right.len()
                && left.iter().all(|(key, value)| {
                    right
                        .get(key)
                        .is_some_and(|other| values_equal(value, other))
                })
        }
        _ => left == right,
    }
}

#[allow(clippy::float_cmp)]
fn numbers_equal(left: &Number, right: &Number) -> bool {
    if left.is_f64() || right.is_f64() {
        left.as_f64() == right.as_f64()
    } else {
        left == right
    }
}

pub(crate) fn ensure_same_entity(
    local: &VersionedSnapshot,
    server: &VersionedSnapshot,
) -> Result<()> {
    if local.same_entity(server) {
        Ok(())
    } else {
        Err(Error::MismatchedEntity {
            local: local.key(),
            server: server.key(),
        })
    }
}

pub(crate) fn diff_fields(local: &VersionedSnapshot, server: &VersionedSnapshot) -> BTreeSet<String> {
    local
        .fields
        .keys()
        .chain(server.fields.keys())
        .filter(|name| match (local.field(name), server.field(name)) {
            (Some(left), Some(right)) => !values_equal(left, right),
            (left, right) => left.is_some() || right.is_some(),
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn snapshot(version: u64) -> VersionedSnapshot {
        VersionedSnapshot::new("products", "42", version)
    }

    fn names(fields: &[&str]) -> BTreeSet<String> {
        fields.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_identical_fields_diff_empty() {
        let local = snapshot(1).with_field("name", "Acme").with_field("price", 10);
        let server = snapshot(2).with_field("name", "Acme").with_field("price", 10);
        assert!(diff(&local, &server).unwrap().is_empty());
    }

    #[test]
    fn test_empty_snapshots_diff_empty() {
        assert!(diff(&snapshot(1), &snapshot(2)).unwrap().is_empty());
    }

    #[test]
    fn test_acme_scenario() {
        let local = snapshot(1).with_field("name", "Acme").with_field("price", 10);
        let server = snapshot(2)
            .with_field("name", "Acme Corp")
            .with_field("price", 10);
        assert_eq!(diff(&local, &server).unwrap(), names(&["name"]));
    }

    #[test]
    fn test_missing_field_differs_from_null() {
        let local = snapshot(1).with_field("note", Value::Null);
        let server = snapshot(2);
        assert_eq!(diff(&local, &server).unwrap(), names(&["note"]));

        let server = snapshot(2).with_field("extra", 1);
        assert_eq!(diff(&local, &server).unwrap(), names(&["extra", "note"]));
    }

    #[test]
    fn test_values_compare_strictly_by_type() {
        let local = snapshot(1).with_field("price", 10);
        let server = snapshot(2).with_field("price", "10");
        assert_eq!(diff(&local, &server).unwrap(), names(&["price"]));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let local = VersionedSnapshot {
            fields: serde_json::from_str(r#"{"price":10,"tags":[1,{"w":2}]}"#).unwrap(),
            ..snapshot(1)
        };
        let server = VersionedSnapshot {
            fields: serde_json::from_str(r#"{"price":10.0,"tags":[1.0,{"w":2.0}]}"#).unwrap(),
            ..snapshot(2)
        };
        assert!(diff(&local, &server).unwrap().is_empty());

        let server = snapshot(2).with_field("price", 10.5);
        assert_eq!(diff(&local, &server).unwrap(), names(&["price", "tags"]));
    }

    #[test]
    fn test_values_equal_rules() {
        assert!(values_equal(&json!(-3), &json!(-3.0)));
        assert!(values_equal(&json!(u64::MAX), &json!(u64::MAX)));
        assert!(!values_equal(&json!(1), &json!(true)));
        assert!(!values_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!values_equal(&json!({"a": 1}), &json!({"a": 1, "b": null})));
        assert!(values_equal(&json!(null), &json!(null)));
    }

    #[test]
    fn test_equal_objects_do_not_differ() {
        let local = snapshot(1).with_field("address", json!({"city": "Oslo", "zip": "0150"}));
        let server = snapshot(2).with_field("address", json!({"zip": "0150", "city": "Oslo"}));
        assert!(diff(&local, &server).unwrap().is_empty());
    }

    #[test]
    fn test_mismatched_entities_fail() {
        let local = VersionedSnapshot::new("products", "42", 1);
        let server = VersionedSnapshot::new("orders", "42", 1);
        match diff(&local, &server).unwrap_err() {
            Error::MismatchedEntity { local, server } => {
                assert_eq!(local.entity_table, "products");
                assert_eq!(server.entity_table, "orders");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_discrepancies_include_values() {
        let local = snapshot(1).with_field("name", "Acme");
        let server = snapshot(2).with_field("name", "Acme Corp").with_field("sku", "A-1");
        assert_eq!(
            discrepancies(&local, &server).unwrap(),
            vec![
                FieldDiscrepancy {
                    field: "name".to_string(),
                    local: Some(json!("Acme")),
                    server: Some(json!("Acme Corp")),
                },
                FieldDiscrepancy {
                    field: "sku".to_string(),
                    local: None,
                    server: Some(json!("A-1")),
                },
            ]
        );
    }

    #[test]
    fn test_canonicalize_sorts_object_keys() {
        let value = json!({"b": 1, "a": [true, null]});
        assert_eq!(canonicalize(&value), r#"{"a":[true,null],"b":1}"#);
    }
}
