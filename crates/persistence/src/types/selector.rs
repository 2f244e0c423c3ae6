//! Equality selectors for document queries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::Document;

/// A set of `field == value` constraints, all of which must hold.
///
/// Serializes to the object expected by a CouchDB `_find` request:
///
/// ```
/// use recordstore_persistence::types::Selector;
/// use serde_json::json;
///
/// let selector = Selector::new().eq("category", "dog").eq("available", true);
/// assert_eq!(
///     serde_json::to_value(&selector).unwrap(),
///     json!({"category": "dog", "available": true})
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector {
    fields: Map<String, Value>,
}

impl Selector {
    /// Creates an empty selector, which matches every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exact-match constraint, replacing any previous one on `field`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Returns `true` if no constraint has been added.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns `true` if every constrained field of `document` equals the
    /// selector value. A missing field never matches.
    pub fn matches(&self, document: &Document) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}
