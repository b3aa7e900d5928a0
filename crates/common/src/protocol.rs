//! Record envelopes exchanged as JSON lines.
//!
//! `sealctl` reads and writes one [`RecordLine`] per line. The same shape is
//! what a storage export of an encryptable model looks like: a model name, an
//! optional identity, and a flat map of scalar columns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single record exported from storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordLine {
    /// Model (table) the record belongs to, e.g. `"users"`.
    pub model: String,
    /// Primary identity of the record, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Column values keyed by column name.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl RecordLine {
    /// Construct an empty [`RecordLine`] for `model`.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            id: None,
            fields: Map::new(),
        }
    }

    /// Set the record identity.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set a single column value.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Human-readable identity used in error reports: `model:id` or `model:?`.
    pub fn identity(&self) -> String {
        match &self.id {
            Some(id) => format!("{}:{}", self.model, id),
            None => format!("{}:?", self.model),
        }
    }
}
