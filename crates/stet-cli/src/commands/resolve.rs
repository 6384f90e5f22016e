use stet_core::{ConflictService, ConflictStore, Strategy};

use crate::commands::common::{
    batch_item_to_view, build_selections, format_batch_lines, resolve_conflict_id, BatchItemView,
};
use crate::error::CliError;

pub fn run_resolve<S: ConflictStore>(
    id: &str,
    strategy: Strategy,
    picks: &[String],
    sets: &[String],
    service: &ConflictService<S>,
) -> Result<(), CliError> {
    if strategy.is_unconditional() && !(picks.is_empty() && sets.is_empty()) {
        return Err(CliError::SelectionsWithoutMerge);
    }

    let conflict_id = resolve_conflict_id(id, service)?;
    let selections = build_selections(picks, sets)?;
    let resolved = service.resolve(&conflict_id, strategy, &selections)?;

    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

/// Returns `true` when at least one conflict was resolved
pub fn run_resolve_all<S: ConflictStore>(
    strategy: Strategy,
    as_json: bool,
    service: &ConflictService<S>,
) -> Result<bool, CliError> {
    let report = service.resolve_all_unresolved(strategy)?;
    let changed = report.succeeded() > 0;

    if as_json {
        let json_items = report
            .items
            .iter()
            .map(batch_item_to_view)
            .collect::<Vec<BatchItemView>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(changed);
    }

    if report.items.is_empty() {
        println!("No open conflicts.");
        return Ok(changed);
    }

    for line in format_batch_lines(&report.items) {
        println!("{line}");
    }
    println!("{} resolved, {} failed", report.succeeded(), report.failed());
    Ok(changed)
}
