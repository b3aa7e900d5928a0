//! [`Record`] access for dynamic JSON rows.
//!
//! Strings are sealed as-is, so a typed model reading the same column sees
//! the same plaintext. Any other non-null value is sealed as
//! [`JSON_MARKER`] followed by its JSON text and is restored with its
//! original type on decrypt. A string that itself starts with the marker is
//! sealed in the marked form too, which keeps the two cases apart.

use std::borrow::Cow;

use common::RecordLine;
use serde_json::Value;

use super::Record;

/// Prefix of a sealed plaintext that carries a JSON value.
pub const JSON_MARKER: &str = "\u{0}json:";

impl Record for RecordLine {
    fn identity(&self) -> String {
        RecordLine::identity(self)
    }

    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match self.fields.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }

    fn set_field(&mut self, name: &str, value: String) {
        self.fields.insert(name.to_owned(), Value::String(value));
    }

    fn plaintext(&self, name: &str) -> Option<Cow<'_, str>> {
        match self.fields.get(name)? {
            Value::Null => None,
            Value::String(s) if !s.starts_with(JSON_MARKER) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(format!("{JSON_MARKER}{other}"))),
        }
    }

    fn set_plaintext(&mut self, name: &str, value: String) {
        let restored = value
            .strip_prefix(JSON_MARKER)
            .and_then(|json| serde_json::from_str(json).ok())
            .unwrap_or(Value::String(value));
        self.fields.insert(name.to_owned(), restored);
    }
}
