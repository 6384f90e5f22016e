pub mod check;
pub mod common;
pub mod completions;
pub mod list;
pub mod report;
pub mod resolve;
pub mod show;
