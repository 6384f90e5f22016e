use std::path::Path;

use stet_core::{ConflictService, ConflictStore, WriteCheck};

use crate::commands::common::read_snapshot;
use crate::error::CliError;

/// Returns `true` when the check opened or refreshed a conflict
pub fn run_check<S: ConflictStore>(
    local_path: &Path,
    server_path: &Path,
    service: &ConflictService<S>,
) -> Result<bool, CliError> {
    let local = read_snapshot(local_path)?;
    let server = read_snapshot(server_path)?;

    match service.check_write(local, server)? {
        WriteCheck::Clear => {
            println!("Write may proceed");
            Ok(false)
        }
        WriteCheck::Conflict(conflict) => {
            println!("Write rejected: conflict {} on {}", conflict.id(), conflict.key());
            Ok(true)
        }
    }
}
