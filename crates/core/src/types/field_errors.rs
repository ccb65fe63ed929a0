//! Structured field errors returned by the backend.
//!
//! Error bodies map a field name to a message or a list of messages, e.g.
//! `{"quantity": ["Insufficient stock"]}` or `{"error": "Product not found"}`.
//! Nested objects are flattened with dotted keys.

use std::collections::BTreeMap;

use core::fmt;

use serde::Serialize;
use serde_json::Value;

/// Keys whose messages are not about a particular field.
const GENERAL_KEYS: &[&str] = &["error", "detail", "non_field_errors"];

/// A `field → messages` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Create an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add a message for `field`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Build from a single field and message.
    #[must_use]
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    /// Parse an error body.
    ///
    /// Objects are flattened; a bare list becomes `non_field_errors` and a
    /// bare string becomes `detail`. Returns `None` when the body holds no
    /// messages at all.
    #[must_use]
    pub fn from_json(body: &Value) -> Option<Self> {
        let mut errors = Self::new();
        match body {
            Value::Object(_) => collect(&mut errors, "", body),
            Value::Array(_) => collect(&mut errors, "non_field_errors", body),
            Value::String(_) => collect(&mut errors, "detail", body),
            _ => {}
        }
        (!errors.is_empty()).then_some(errors)
    }

    /// Messages for `field`.
    #[must_use]
    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map_or(&[][..], Vec::as_slice)
    }

    /// Field names in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// One display line per field.
    ///
    /// General keys (`error`, `detail`, `non_field_errors`) show their
    /// messages alone; other fields are prefixed with `field: `.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|(field, messages)| {
                let joined = messages.join(" ");
                if GENERAL_KEYS.contains(&field.as_str()) {
                    joined
                } else {
                    format!("{field}: {joined}")
                }
            })
            .collect()
    }

    /// All lines joined with `\n`.
    #[must_use]
    pub fn render(&self) -> String {
        self.lines().join("\n")
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn collect(errors: &mut FieldErrors, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(message) => errors.push(key, message.clone()),
        Value::Array(values) => {
            for value in values {
                collect(errors, key, value);
            }
        }
        Value::Object(map) => {
            for (field, value) in map {
                let nested = if key.is_empty() {
                    field.clone()
                } else {
                    format!("{key}.{field}")
                };
                collect(errors, &nested, value);
            }
        }
        other => errors.push(key, other.to_string()),
    }
}
