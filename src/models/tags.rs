//! Tag normalization at the ingestion boundary.
//!
//! The backend may send `tags` as a native array or as a string holding a
//! serialized array. Both shapes collapse into [`Tags`] before a record enters
//! the store; nothing past this module branches on the wire shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The shapes a `tags` field can take on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum WireTags {
    List(Vec<Value>),
    Encoded(String),
    Other(Value),
}

impl From<Value> for WireTags {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => WireTags::List(items),
            Value::String(raw) => WireTags::Encoded(raw),
            other => WireTags::Other(other),
        }
    }
}

/// Canonical tag set: insertion order kept, duplicates and blanks removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if tag.is_empty() || out.iter().any(|existing| existing == tag) {
                continue;
            }
            out.push(tag.to_string());
        }
        Self(out)
    }

    /// Normalize any wire value. Never fails: malformed input is an empty set.
    pub fn normalize(value: impl Into<WireTags>) -> Self {
        match value.into() {
            WireTags::List(items) => Self::new(items.iter().filter_map(Value::as_str)),
            WireTags::Encoded(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Array(items)) => Self::new(items.iter().filter_map(Value::as_str)),
                _ => Self::default(),
            },
            WireTags::Other(_) => Self::default(),
        }
    }

    /// Parse the JSON text form used for persistence.
    pub fn from_json_text(raw: &str) -> Self {
        Self::normalize(WireTags::Encoded(raw.to_string()))
    }

    pub fn to_json_text(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<'de> Deserialize<'de> for Tags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Anything that is valid JSON is accepted; the shape is sorted out by normalize.
        let value = Value::deserialize(deserializer).unwrap_or(Value::Null);
        Ok(Tags::normalize(value))
    }
}

impl From<Vec<String>> for Tags {
    fn from(tags: Vec<String>) -> Self {
        Tags::new(tags)
    }
}

impl<'a> IntoIterator for &'a Tags {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
