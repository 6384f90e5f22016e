//! Merge selection model

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::conflict::ConflictRecord;

/// Which value a merge keeps for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeChoice {
    /// The initiating actor's value
    Local,
    /// The persisted value
    Server,
    /// A caller-supplied literal
    Value(Value),
}

/// Per-field choice supplied when resolving with `Strategy::Merge`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSelection {
    /// Field being decided; must be one of the conflict's diffed fields
    pub field_name: String,
    pub choice: MergeChoice,
}

impl MergeSelection {
    pub fn new(field_name: impl Into<String>, choice: MergeChoice) -> Self {
        Self {
            field_name: field_name.into(),
            choice,
        }
    }

    /// Keep the local value of `field_name`
    pub fn local(field_name: impl Into<String>) -> Self {
        Self::new(field_name, MergeChoice::Local)
    }

    /// Keep the server value of `field_name`
    pub fn server(field_name: impl Into<String>) -> Self {
        Self::new(field_name, MergeChoice::Server)
    }

    /// Set `field_name` to a literal
    pub fn value(field_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field_name, MergeChoice::Value(value.into()))
    }

    /// Value this selection resolves to, `None` when the chosen side leaves the
    /// field undefined
    pub fn chosen_value(&self, conflict: &ConflictRecord) -> Option<Value> {
        match &self.choice {
            MergeChoice::Local => conflict.local().field(&self.field_name).cloned(),
            MergeChoice::Server => conflict.server().field(&self.field_name).cloned(),
            MergeChoice::Value(value) => Some(value.clone()),
        }
    }
}
