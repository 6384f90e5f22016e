//! Application services

mod conflicts;

pub use conflicts::{ConflictService, WriteCheck};
