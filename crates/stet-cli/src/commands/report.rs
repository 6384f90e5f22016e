use std::path::Path;

use stet_core::store::Detection;
use stet_core::{ConflictService, ConflictStore};

use crate::commands::common::{format_detection_line, read_snapshot};
use crate::error::CliError;

/// Returns `true` when the state changed
pub fn run_report<S: ConflictStore>(
    local_path: &Path,
    server_path: &Path,
    service: &ConflictService<S>,
) -> Result<bool, CliError> {
    let local = read_snapshot(local_path)?;
    let server = read_snapshot(server_path)?;
    let submitted_version = server.version;

    let detection = service.report_detection(local, server)?;
    let fields = detection
        .record()
        .field_diffs()
        .iter()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");

    println!("{}", format_detection_line(&detection, submitted_version));
    println!("Differing fields: {fields}");
    Ok(!matches!(detection, Detection::Stale(_)))
}
