use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use stet_core::diff::{canonicalize, FieldDiscrepancy};
use stet_core::models::FieldMap;
use stet_core::notify::ConflictEvent;
use stet_core::resolve::{BatchItem, BatchOutcome};
use stet_core::store::Detection;
use stet_core::util::normalize_text_option;
use stet_core::{
    ConflictId, ConflictRecord, ConflictService, ConflictStore, MergeSelection, ResolvedEntity,
    VersionedSnapshot,
};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct ConflictListItem {
    pub id: String,
    pub entity_table: String,
    pub record_id: String,
    pub status: String,
    pub local_version: u64,
    pub server_version: u64,
    pub fields: Vec<String>,
    pub detected_at: i64,
    pub detected_at_iso: String,
    pub relative_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ConflictDetail {
    #[serde(flatten)]
    pub summary: ConflictListItem,
    pub discrepancies: Vec<FieldDiscrepancy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_fields: Option<FieldMap>,
}

#[derive(Debug, Serialize)]
pub struct BatchItemView {
    pub conflict_id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved: Option<ResolvedEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn read_snapshot(path: &Path) -> Result<VersionedSnapshot, CliError> {
    let snapshot_error = |message: String| CliError::Snapshot {
        path: path.display().to_string(),
        message,
    };

    let raw = std::fs::read_to_string(path).map_err(|error| snapshot_error(error.to_string()))?;
    serde_json::from_str(&raw).map_err(|error| snapshot_error(error.to_string()))
}

pub fn normalize_conflict_identifier(id: &str) -> Result<String, CliError> {
    normalize_text_option(Some(id.to_string()))
        .map(|id| id.to_ascii_lowercase())
        .ok_or(CliError::EmptyConflictId)
}

/// Full conflict id for an exact id or a unique id prefix
pub fn resolve_conflict_id<S: ConflictStore>(
    query: &str,
    service: &ConflictService<S>,
) -> Result<ConflictId, CliError> {
    let query = normalize_conflict_identifier(query)?;

    if let Ok(id) = query.parse::<ConflictId>() {
        if service.get(&id).is_ok() {
            return Ok(id);
        }
    }

    let matching_ids = service
        .store()
        .all()
        .iter()
        .map(ConflictRecord::id)
        .filter(|id| id.to_string().starts_with(&query))
        .collect::<Vec<_>>();

    match matching_ids.as_slice() {
        [] => Err(CliError::ConflictNotFound(query)),
        [id] => Ok(*id),
        _ => {
            let options = matching_ids
                .iter()
                .take(3)
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousConflictId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

/// Parse `FIELD=local` / `FIELD=server`
pub fn parse_pick(raw: &str) -> Result<MergeSelection, CliError> {
    let (field, side) = split_assignment(raw).ok_or_else(|| CliError::InvalidPick(raw.into()))?;

    match side.trim().to_ascii_lowercase().as_str() {
        "local" => Ok(MergeSelection::local(field)),
        "server" => Ok(MergeSelection::server(field)),
        _ => Err(CliError::InvalidPick(raw.to_string())),
    }
}

/// Parse `FIELD=JSON`
pub fn parse_set(raw: &str) -> Result<MergeSelection, CliError> {
    let (field, value) = split_assignment(raw).ok_or_else(|| CliError::InvalidSet(raw.into()))?;
    let value = serde_json::from_str::<Value>(value.trim())
        .map_err(|_| CliError::InvalidSet(raw.to_string()))?;
    Ok(MergeSelection::value(field, value))
}

pub fn build_selections(picks: &[String], sets: &[String]) -> Result<Vec<MergeSelection>, CliError> {
    picks
        .iter()
        .map(|raw| parse_pick(raw))
        .chain(sets.iter().map(|raw| parse_set(raw)))
        .collect()
}

fn split_assignment(raw: &str) -> Option<(&str, &str)> {
    let (field, rest) = raw.split_once('=')?;
    let field = field.trim();
    (!field.is_empty()).then_some((field, rest))
}

pub fn conflict_to_item(conflict: &ConflictRecord) -> ConflictListItem {
    let now_ms = Utc::now().timestamp_millis();
    let resolution = conflict.resolution();

    ConflictListItem {
        id: conflict.id().to_string(),
        entity_table: conflict.entity_table().to_string(),
        record_id: conflict.record_id().to_string(),
        status: conflict.status().to_string(),
        local_version: conflict.local().version,
        server_version: conflict.server().version,
        fields: conflict.field_diffs().iter().cloned().collect(),
        detected_at: conflict.detected_at(),
        detected_at_iso: format_timestamp(conflict.detected_at()),
        relative_time: format_relative_time(conflict.detected_at(), now_ms),
        strategy: resolution.map(|resolution| resolution.strategy.to_string()),
        resolved_at: resolution.map(|resolution| resolution.resolved_at),
    }
}

pub fn conflict_to_detail(conflict: &ConflictRecord) -> ConflictDetail {
    ConflictDetail {
        summary: conflict_to_item(conflict),
        discrepancies: conflict.discrepancies(),
        merged_fields: conflict
            .resolution()
            .map(|resolution| resolution.merged_fields.clone()),
    }
}

pub fn batch_item_to_view(item: &BatchItem) -> BatchItemView {
    BatchItemView {
        conflict_id: item.conflict_id.to_string(),
        ok: item.outcome.is_success(),
        resolved: item.outcome.resolved().cloned(),
        error: item.outcome.error().map(ToString::to_string),
    }
}

pub fn format_conflict_lines(conflicts: &[ConflictRecord]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    conflicts
        .iter()
        .map(|conflict| {
            let key = conflict.key().to_string();
            let fields = conflict
                .field_diffs()
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(",");
            let relative_time = format_relative_time(conflict.detected_at(), now_ms);
            let status = match conflict.resolution() {
                Some(resolution) => format!("resolved:{}", resolution.strategy),
                None => conflict.status().to_string(),
            };

            format!(
                "{}  {status:<20}  {key:<24}  v{}/v{}  {relative_time:<10}  [{fields}]",
                conflict.id(),
                conflict.local().version,
                conflict.server().version,
            )
        })
        .collect()
}

pub fn format_discrepancy_lines(conflict: &ConflictRecord) -> Vec<String> {
    let mut lines = vec![
        format!("Conflict {}", conflict.id()),
        format!("  record:   {}", conflict.key()),
        format!("  status:   {}", conflict.status()),
        format!(
            "  versions: local v{}, server v{}",
            conflict.local().version,
            conflict.server().version
        ),
        format!("  detected: {}", format_timestamp(conflict.detected_at())),
    ];

    if let Some(refreshed_at) = conflict.refreshed_at() {
        lines.push(format!("  refreshed: {}", format_timestamp(refreshed_at)));
    }

    if let Some(resolution) = conflict.resolution() {
        lines.push(format!(
            "  resolved: {} with {}",
            format_timestamp(resolution.resolved_at),
            resolution.strategy
        ));
    }

    let discrepancies = conflict.discrepancies();
    if discrepancies.is_empty() {
        lines.push("  no differing fields".to_string());
    }
    for discrepancy in discrepancies {
        lines.push(format!(
            "  {}: local={} server={}",
            discrepancy.field,
            format_field_value(discrepancy.local.as_ref()),
            format_field_value(discrepancy.server.as_ref())
        ));
    }

    lines
}

pub fn format_batch_lines(items: &[BatchItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| match &item.outcome {
            BatchOutcome::Success(resolved) => format!(
                "{}  ok      {}/{}",
                item.conflict_id, resolved.entity_table, resolved.record_id
            ),
            BatchOutcome::Failure(error) => format!("{}  failed  {error}", item.conflict_id),
        })
        .collect()
}

/// Outcome of a report; `submitted_version` is the server version passed in
pub fn format_detection_line(detection: &Detection, submitted_version: u64) -> String {
    match detection {
        Detection::Created(record) => format!("Opened conflict {} on {}", record.id(), record.key()),
        Detection::Refreshed(record) => format!(
            "Refreshed conflict {} on {} with server v{}",
            record.id(),
            record.key(),
            record.server().version
        ),
        Detection::Stale(record) => format!(
            "Ignored stale server v{submitted_version}: conflict {} on {} already holds v{}",
            record.id(),
            record.key(),
            record.server().version
        ),
    }
}

pub fn format_event_line(event: &ConflictEvent) -> String {
    format!(
        "conflict {}: {} on {}",
        event.transition.as_str(),
        event.conflict.id(),
        event.conflict.key()
    )
}

/// Canonical JSON for a field value; `(undefined)` when the field is absent
pub fn format_field_value(value: Option<&Value>) -> String {
    value.map_or_else(|| "(undefined)".to_string(), canonicalize)
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else {
        format!("{}d ago", diff / day)
    }
}

/// Print every notification until all senders are gone
pub async fn drain_notifications(mut receiver: UnboundedReceiver<ConflictEvent>) -> usize {
    let mut delivered = 0;
    while let Some(event) = receiver.recv().await {
        eprintln!("{}", format_event_line(&event));
        delivered += 1;
    }
    delivered
}
