//! Resolution engine
//!
//! Applies a strategy to one open conflict, closes it, and hands the final
//! field values back to the caller for persisting.

mod batch;

pub use batch::{ensure_batch_strategy, BatchItem, BatchOutcome, BatchReport};

use std::collections::BTreeMap;

use crate::config::{MergeCompleteness, ResolverConfig};
use crate::error::{Error, Result};
use crate::models::{
    ConflictRecord, FieldMap, MergeSelection, Resolution, ResolvedEntity, Strategy,
};
use crate::util::now_ms;

/// Executes resolution strategies against conflict records
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolutionEngine {
    merge_completeness: MergeCompleteness,
}

impl ResolutionEngine {
    pub const fn new(merge_completeness: MergeCompleteness) -> Self {
        Self { merge_completeness }
    }

    pub const fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.merge_completeness)
    }

    /// Resolve `conflict` with `strategy`
    ///
    /// `selections` are only read for [`Strategy::Merge`]. Every precondition
    /// is checked before the record is touched, so on error the conflict is
    /// exactly as it was.
    pub fn resolve(
        &self,
        conflict: &mut ConflictRecord,
        strategy: Strategy,
        selections: &[MergeSelection],
    ) -> Result<ResolvedEntity> {
        if conflict.is_resolved() {
            return Err(Error::AlreadyResolved {
                conflict_id: conflict.id(),
            });
        }

        let fields = match strategy {
            Strategy::LocalWins => {
                log_ignored_selections(conflict, strategy, selections);
                conflict.local().fields.clone()
            }
            Strategy::ServerWins => {
                log_ignored_selections(conflict, strategy, selections);
                conflict.server().fields.clone()
            }
            Strategy::Merge => self.merge_fields(conflict, selections)?,
        };

        let resolved = ResolvedEntity {
            conflict_id: conflict.id(),
            entity_table: conflict.entity_table().to_string(),
            record_id: conflict.record_id().to_string(),
            fields: fields.clone(),
            base_version: conflict.server().version,
            strategy,
        };

        conflict.mark_resolved(Resolution {
            strategy,
            merged_fields: fields,
            resolved_at: now_ms(),
        });

        tracing::info!(
            "Resolved conflict {} on {} with {}",
            resolved.conflict_id,
            conflict.key(),
            strategy
        );
        Ok(resolved)
    }

    /// Server fields with each diffed field replaced by its selection
    fn merge_fields(
        &self,
        conflict: &ConflictRecord,
        selections: &[MergeSelection],
    ) -> Result<FieldMap> {
        let diffs = conflict.field_diffs();

        let mut chosen: BTreeMap<&str, &MergeSelection> = BTreeMap::new();
        for selection in selections {
            if chosen
                .insert(selection.field_name.as_str(), selection)
                .is_some()
            {
                return Err(Error::DuplicateSelection {
                    conflict_id: conflict.id(),
                    field: selection.field_name.clone(),
                });
            }
        }

        let extra = chosen
            .keys()
            .filter(|name| !diffs.contains(**name))
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        let missing = match self.merge_completeness {
            MergeCompleteness::Strict => diffs
                .iter()
                .filter(|name| !chosen.contains_key(name.as_str()))
                .cloned()
                .collect::<Vec<_>>(),
            MergeCompleteness::FillFromServer => Vec::new(),
        };
        if !missing.is_empty() || !extra.is_empty() {
            return Err(Error::IncompleteMerge {
                conflict_id: conflict.id(),
                missing,
                extra,
            });
        }

        let mut merged = conflict.server().fields.clone();
        for field in diffs {
            let value = chosen.get(field.as_str()).map_or_else(
                || conflict.server().field(field).cloned(),
                |selection| selection.chosen_value(conflict),
            );
            match value {
                Some(value) => {
                    merged.insert(field.clone(), value);
                }
                None => {
                    merged.remove(field);
                }
            }
        }

        Ok(merged)
    }
}

fn log_ignored_selections(
    conflict: &ConflictRecord,
    strategy: Strategy,
    selections: &[MergeSelection],
) {
    if !selections.is_empty() {
        tracing::debug!(
            "Ignoring {} merge selections for conflict {} resolved with {}",
            selections.len(),
            conflict.id(),
            strategy
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConflictStatus, VersionedSnapshot};
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

    fn wide_conflict() -> ConflictRecord {
        let local = VersionedSnapshot::new("customers", "7", 4)
            .with_field("name", "Ada")
            .with_field("email", "ada@old.example")
            .with_field("phone", "555-0100")
            .with_field("tier", "gold")
            .with_field("nickname", "A");
        let server = VersionedSnapshot::new("customers", "7", 5)
            .with_field("name", "Ada")
            .with_field("email", "ada@new.example")
            .with_field("phone", "555-0199")
            .with_field("tier", "gold")
            .with_field("region", "eu");
        ConflictRecord::detect(local, server).unwrap()
    }

    fn fields(value: serde_json::Value) -> FieldMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_merge_acme_scenario() {
        let engine = ResolutionEngine::default();
        let mut conflict = acme_conflict();

        let resolved = engine
            .resolve(
                &mut conflict,
                Strategy::Merge,
                &[MergeSelection::value("name", "Acme Corp")],
            )
            .unwrap();

        assert_eq!(resolved.fields, fields(json!({"name": "Acme Corp", "price": 10})));
        assert_eq!(resolved.base_version, 2);
        assert_eq!(conflict.status(), ConflictStatus::Resolved);
        let resolution = conflict.resolution().unwrap();
        assert_eq!(resolution.strategy, Strategy::Merge);
        assert_eq!(resolution.merged_fields, resolved.fields);
    }

    #[test]
    fn test_local_wins_acme_scenario() {
        let engine = ResolutionEngine::default();
        let mut conflict = acme_conflict();

        let resolved = engine
            .resolve(&mut conflict, Strategy::LocalWins, &[])
            .unwrap();

        assert_eq!(resolved.fields, fields(json!({"name": "Acme", "price": 10})));
    }

    #[test]
    fn test_merge_with_empty_selections_names_missing_field() {
        let engine = ResolutionEngine::default();
        let mut conflict = acme_conflict();

        match engine.resolve(&mut conflict, Strategy::Merge, &[]).unwrap_err() {
            Error::IncompleteMerge {
                conflict_id,
                missing,
                extra,
            } => {
                assert_eq!(conflict_id, conflict.id());
                assert_eq!(missing, vec!["name".to_string()]);
                assert!(extra.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(conflict.status(), ConflictStatus::Unresolved);
        assert!(conflict.resolution().is_none());
    }

    #[test]
    fn test_local_wins_copies_every_local_field() {
        let engine = ResolutionEngine::default();
        let mut conflict = wide_conflict();
        let local_fields = conflict.local().fields.clone();

        let resolved = engine
            .resolve(&mut conflict, Strategy::LocalWins, &[])
            .unwrap();

        assert_eq!(resolved.fields, local_fields);
        assert!(!resolved.fields.contains_key("region"));
    }

    #[test]
    fn test_server_wins_copies_every_server_field() {
        let engine = ResolutionEngine::default();
        let mut conflict = wide_conflict();
        let server_fields = conflict.server().fields.clone();

        let resolved = engine
            .resolve(
                &mut conflict,
                Strategy::ServerWins,
                &[MergeSelection::local("email")],
            )
            .unwrap();

        assert_eq!(resolved.fields, server_fields);
        assert_eq!(resolved.strategy, Strategy::ServerWins);
    }

    #[test]
    fn test_merge_only_alters_diffed_fields() {
        let engine = ResolutionEngine::default();
        let mut conflict = wide_conflict();
        assert_eq!(
            conflict.field_diffs().iter().collect::<Vec<_>>(),
            vec!["email", "nickname", "phone", "region"]
        );

        let resolved = engine
            .resolve(
                &mut conflict,
                Strategy::Merge,
                &[
                    MergeSelection::local("email"),
                    MergeSelection::server("phone"),
                    MergeSelection::local("nickname"),
                    MergeSelection::local("region"),
                ],
            )
            .unwrap();

        assert_eq!(
            resolved.fields,
            fields(json!({
                "name": "Ada",
                "email": "ada@old.example",
                "phone": "555-0199",
                "tier": "gold",
                "nickname": "A"
            }))
        );
    }

    #[test]
    fn test_merge_reports_missing_and_extra_fields() {
        let engine = ResolutionEngine::default();
        let mut conflict = wide_conflict();

        let error = engine
            .resolve(
                &mut conflict,
                Strategy::Merge,
                &[
                    MergeSelection::local("email"),
                    MergeSelection::local("tier"),
                ],
            )
            .unwrap_err();

        match error {
            Error::IncompleteMerge { missing, extra, .. } => {
                assert_eq!(missing, vec!["nickname", "phone", "region"]);
                assert_eq!(extra, vec!["tier"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!conflict.is_resolved());
    }

    #[test]
    fn test_merge_rejects_duplicate_selection() {
        let engine = ResolutionEngine::default();
        let mut conflict = acme_conflict();

        let error = engine
            .resolve(
                &mut conflict,
                Strategy::Merge,
                &[
                    MergeSelection::local("name"),
                    MergeSelection::server("name"),
                ],
            )
            .unwrap_err();

        assert!(matches!(error, Error::DuplicateSelection { ref field, .. } if field == "name"));
        assert!(!conflict.is_resolved());
    }

    #[test]
    fn test_fill_from_server_defaults_unselected_fields() {
        let engine = ResolutionEngine::new(MergeCompleteness::FillFromServer);
        let mut conflict = wide_conflict();

        let resolved = engine
            .resolve(
                &mut conflict,
                Strategy::Merge,
                &[MergeSelection::value("email", "ada@both.example")],
            )
            .unwrap();

        let mut expected = conflict.server().fields.clone();
        expected.insert("email".to_string(), json!("ada@both.example"));
        assert_eq!(resolved.fields, expected);
    }

    #[test]
    fn test_fill_from_server_still_rejects_extra_fields() {
        let engine = ResolutionEngine::new(MergeCompleteness::FillFromServer);
        let mut conflict = acme_conflict();

        let error = engine
            .resolve(
                &mut conflict,
                Strategy::Merge,
                &[MergeSelection::local("price")],
            )
            .unwrap_err();

        assert!(matches!(error, Error::IncompleteMerge { ref extra, .. } if extra == &["price"]));
    }

    #[test]
    fn test_resolved_conflict_rejects_second_resolution() {
        let engine = ResolutionEngine::default();
        let mut conflict = acme_conflict();
        engine
            .resolve(&mut conflict, Strategy::ServerWins, &[])
            .unwrap();
        let first = conflict.resolution().cloned();

        for strategy in [Strategy::LocalWins, Strategy::ServerWins, Strategy::Merge] {
            let error = engine.resolve(&mut conflict, strategy, &[]).unwrap_err();
            assert!(matches!(error, Error::AlreadyResolved { conflict_id } if conflict_id == conflict.id()));
        }
        assert_eq!(conflict.resolution().cloned(), first);
    }
}
