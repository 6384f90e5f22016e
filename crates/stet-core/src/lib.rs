//! stet-core - Core library for stet
//!
//! This crate contains the conflict models, field differ, resolution engine,
//! conflict store, and notification bridge used by every stet write path
//! (the CLI and any embedding application).

pub mod config;
pub mod diff;
pub mod error;
pub mod models;
pub mod notify;
pub mod resolve;
pub mod services;
pub mod store;
pub mod util;

pub use config::ResolverConfig;
pub use error::{Error, Result};
pub use models::{
    ConflictId, ConflictRecord, ConflictStatus, MergeChoice, MergeSelection, ResolvedEntity,
    Strategy, VersionedSnapshot,
};
pub use services::{ConflictService, WriteCheck};
pub use store::{ConflictStore, InMemoryConflictStore};
