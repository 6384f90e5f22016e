//! Data models for stet

mod conflict;
mod resolved;
mod selection;
mod snapshot;

pub use conflict::{ConflictId, ConflictRecord, ConflictStatus, Resolution, Strategy};
pub use resolved::ResolvedEntity;
pub use selection::{MergeChoice, MergeSelection};
pub use snapshot::{EntityKey, FieldMap, VersionedSnapshot};
