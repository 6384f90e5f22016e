use stet_core::{ConflictService, ConflictStore};

use crate::commands::common::{conflict_to_detail, format_discrepancy_lines, resolve_conflict_id};
use crate::error::CliError;

pub fn run_show<S: ConflictStore>(
    id: &str,
    as_json: bool,
    service: &ConflictService<S>,
) -> Result<(), CliError> {
    let conflict_id = resolve_conflict_id(id, service)?;
    let conflict = service.get(&conflict_id)?;

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&conflict_to_detail(&conflict))?
        );
    } else {
        for line in format_discrepancy_lines(&conflict) {
            println!("{line}");
        }
    }

    Ok(())
}
