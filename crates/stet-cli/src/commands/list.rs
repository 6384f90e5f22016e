use stet_core::{ConflictService, ConflictStore};

use crate::cli::StatusFilter;
use crate::commands::common::{conflict_to_item, format_conflict_lines, ConflictListItem};
use crate::error::CliError;

pub fn run_list<S: ConflictStore>(
    filter: StatusFilter,
    as_json: bool,
    service: &ConflictService<S>,
) -> Result<(), CliError> {
    let conflicts = match filter.status() {
        Some(status) => service.list_by_status(status),
        None => service.store().all(),
    };

    if as_json {
        let json_items = conflicts
            .iter()
            .map(conflict_to_item)
            .collect::<Vec<ConflictListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if conflicts.is_empty() {
        println!("No conflicts recorded.");
        return Ok(());
    }

    for line in format_conflict_lines(&conflicts) {
        println!("{line}");
    }
    Ok(())
}
