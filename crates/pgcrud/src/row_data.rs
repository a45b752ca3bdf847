//! Field/value maps attached to a registered entity.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use std::collections::BTreeMap;

/// Values keyed by field name.
///
/// A field that is absent is "undefined" and never emitted; a field present
/// with [`Value::Null`] is written as NULL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowData {
    values: BTreeMap<String, Value>,
}

impl RowData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.values.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build from a JSON object.
    pub fn from_json(value: serde_json::Value) -> OrmResult<Self> {
        match value {
            serde_json::Value::Object(map) => Ok(map
                .into_iter()
                .map(|(k, v)| (k, Value::from_json(v)))
                .collect()),
            other => Err(OrmError::Other(format!(
                "row data must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Fields of `self` that are new or differ from `previous`.
    pub fn changes_from(&self, previous: &RowData) -> RowData {
        self.values
            .iter()
            .filter(|(k, v)| previous.get(k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RowData {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
