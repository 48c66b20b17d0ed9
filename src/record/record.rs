//! Records and record input data

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

use super::id::RecordId;
use super::value::Value;

static NULL: Value = Value::Null;

/// A uniquely identified row of typed column values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Creates a record. The id is not part of `values`.
    pub fn new(id: RecordId, values: BTreeMap<String, Value>) -> Self {
        Self { id, values }
    }

    /// Returns the record id
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Returns a column value, or `None` for unknown columns
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Returns the value of a field, treating `id` as a field and
    /// missing columns as null
    pub fn value_of(&self, field: &str) -> Cow<'_, Value> {
        if field == "id" {
            return Cow::Owned(self.id.to_value());
        }
        Cow::Borrowed(self.values.get(field).unwrap_or(&NULL))
    }

    /// Returns all column values in column-name order
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Returns a copy with the given columns replaced
    pub fn merged(&self, patch: BTreeMap<String, Value>) -> Record {
        let mut values = self.values.clone();
        values.extend(patch);
        Record {
            id: self.id.clone(),
            values,
        }
    }

    /// Renders the record as a JSON object including `id`
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        object.insert("id".to_string(), self.id.to_value().to_json());
        for (name, value) in &self.values {
            object.insert(name.clone(), value.to_json());
        }
        serde_json::Value::Object(object)
    }
}

/// Column values supplied to `create`, or a patch supplied to `update`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordData(BTreeMap<String, Value>);

impl RecordData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }

    /// Parses a JSON object of column values
    pub fn from_json(json: &serde_json::Value) -> StoreResult<Self> {
        let object = json.as_object().ok_or_else(|| {
            StoreError::validation(format!("record data must be an object, got {}", json))
        })?;
        Ok(object
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect())
    }
}

impl FromIterator<(String, Value)> for RecordData {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for RecordData {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
