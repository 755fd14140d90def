//! Flat field sets written to local entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::EntryId;

/// Field handle to value, ordered by handle.
pub type FieldSet = BTreeMap<String, FieldValue>;

/// A single field value. There is no null variant: absent remote data
/// becomes an empty string or an empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    /// Links to other local entries or categories.
    Relations(Vec<EntryId>),
    /// Table rows.
    Rows(Vec<FieldSet>),
    /// Typed, keyed sub-records.
    Blocks(Vec<Block>),
}

impl FieldValue {
    /// Create a text value.
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Create a text value from an optional remote attribute.
    #[must_use]
    pub fn text_or_empty(value: Option<&str>) -> Self {
        FieldValue::Text(value.unwrap_or_default().to_string())
    }

    /// Create a 1/0 flag from a `"y"` sentinel.
    #[must_use]
    pub fn yes_flag(value: Option<&str>) -> Self {
        FieldValue::Integer(i64::from(value == Some("y")))
    }

    /// Get the text content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the value holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Integer(_) => false,
            FieldValue::Relations(v) => v.is_empty(),
            FieldValue::Rows(v) => v.is_empty(),
            FieldValue::Blocks(v) => v.is_empty(),
        }
    }
}

/// One keyed sub-record of a block field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Synthetic 1-based key (`new1`, `new2`, ...).
    pub key: String,
    /// Block type discriminator.
    pub block_type: String,
    pub fields: FieldSet,
}

/// Everything written to a local entry for one remote record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedEntry {
    pub title: String,
    pub enabled: bool,
    pub fields: FieldSet,
    /// New post date. `None` leaves the stored post date untouched.
    pub post_date: Option<DateTime<Utc>>,
    /// New expiry date, written as given.
    pub expiry_date: Option<DateTime<Utc>>,
}

impl MappedEntry {
    /// Text of a field, if present and textual.
    #[must_use]
    pub fn text(&self, handle: &str) -> Option<&str> {
        self.fields.get(handle).and_then(FieldValue::as_text)
    }
}
