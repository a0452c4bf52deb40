//! Live value trees handed to documents for writing.
//!
//! A [`Value`] is tagged when it is built: references to lists, documents and
//! reference tokens are distinct variants, so the codec never has to inspect a
//! value to find out what it is.

use std::collections::btree_map;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ddocs_types::{EntityId, ObjectId};
use serde_json::{Map, Value as JsonValue};

/// One node of a live content tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Any JSON value stored as-is. Arrays are opaque: references nested
    /// inside them are not tracked.
    Scalar(JsonValue),
    /// Stored as its RFC 3339 text.
    Date(DateTime<Utc>),
    /// Reference to a list entity.
    List(EntityId),
    /// Reference to a document entity.
    Document(EntityId),
    /// Reference token; stored as `null` when unset.
    Token(ObjectId),
    /// Nested plain object, flattened recursively.
    Object(Content),
}

impl Value {
    /// Whether this value is stored as an id and rebuilt as a reference.
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::List(_) | Self::Document(_) | Self::Token(_))
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(map) => Self::Object(Content::from(map)),
            other => Self::Scalar(other),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Scalar(JsonValue::String(value.to_string()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Scalar(JsonValue::String(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Scalar(JsonValue::Bool(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Scalar(JsonValue::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Scalar(JsonValue::from(value))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Self::Token(value)
    }
}

impl From<Content> for Value {
    fn from(value: Content) -> Self {
        Self::Object(value)
    }
}

/// A plain object of live values, keyed in sorted order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Content(BTreeMap<String, Value>);

impl Content {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl From<Map<String, JsonValue>> for Content {
    fn from(map: Map<String, JsonValue>) -> Self {
        Self(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Content {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<'a> IntoIterator for &'a Content {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
