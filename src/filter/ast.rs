//! Filter expression tree
//!
//! A `WhereInput` is either a field condition or an `AND`/`OR` over child
//! expressions. An empty `AND` matches every record; an empty `OR` matches
//! none.

use crate::error::{StoreError, StoreResult};
use crate::record::Value;

/// A single condition on one field
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Value),
    Not(Value),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    NotStartsWith(String),
    NotEndsWith(String),
    NotContains(String),
    /// List column contains the value
    Has(Value),
    /// List column contains every value
    HasEvery(Vec<Value>),
    /// List column contains at least one value
    HasSome(Vec<Value>),
}

impl Condition {
    /// Returns the operator name as written in JSON filters
    pub fn op_name(&self) -> &'static str {
        match self {
            Condition::Equals(_) => "equals",
            Condition::Not(_) => "not",
            Condition::In(_) => "in",
            Condition::NotIn(_) => "notIn",
            Condition::Gt(_) => "gt",
            Condition::Gte(_) => "gte",
            Condition::Lt(_) => "lt",
            Condition::Lte(_) => "lte",
            Condition::StartsWith(_) => "startsWith",
            Condition::EndsWith(_) => "endsWith",
            Condition::Contains(_) => "contains",
            Condition::NotStartsWith(_) => "notStartsWith",
            Condition::NotEndsWith(_) => "notEndsWith",
            Condition::NotContains(_) => "notContains",
            Condition::Has(_) => "has",
            Condition::HasEvery(_) => "hasEvery",
            Condition::HasSome(_) => "hasSome",
        }
    }

    fn from_json(op: &str, json: &serde_json::Value) -> StoreResult<Self> {
        let value = || Value::from_json(json);
        let string = || {
            json.as_str().map(str::to_string).ok_or_else(|| {
                StoreError::validation(format!("operator '{}' expects a string, got {}", op, json))
            })
        };
        let list = || -> StoreResult<Vec<Value>> {
            match json {
                serde_json::Value::Array(items) => Ok(items.iter().map(Value::from_json).collect()),
                other => Err(StoreError::validation(format!(
                    "operator '{}' expects an array, got {}",
                    op, other
                ))),
            }
        };

        Ok(match op {
            "equals" => Condition::Equals(value()),
            "not" => Condition::Not(value()),
            "in" => Condition::In(list()?),
            "notIn" => Condition::NotIn(list()?),
            "gt" => Condition::Gt(value()),
            "gte" => Condition::Gte(value()),
            "lt" => Condition::Lt(value()),
            "lte" => Condition::Lte(value()),
            "startsWith" => Condition::StartsWith(string()?),
            "endsWith" => Condition::EndsWith(string()?),
            "contains" => Condition::Contains(string()?),
            "notStartsWith" => Condition::NotStartsWith(string()?),
            "notEndsWith" => Condition::NotEndsWith(string()?),
            "notContains" => Condition::NotContains(string()?),
            "has" => Condition::Has(value()),
            "hasEvery" => Condition::HasEvery(list()?),
            "hasSome" => Condition::HasSome(list()?),
            other => {
                return Err(StoreError::validation(format!(
                    "unknown filter operator '{}'",
                    other
                )))
            }
        })
    }
}

/// Filter expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum WhereInput {
    Field { field: String, condition: Condition },
    And(Vec<WhereInput>),
    Or(Vec<WhereInput>),
}

impl Default for WhereInput {
    fn default() -> Self {
        WhereInput::all()
    }
}

impl WhereInput {
    /// Matches every record
    pub fn all() -> Self {
        WhereInput::And(Vec::new())
    }

    pub fn and(children: impl IntoIterator<Item = WhereInput>) -> Self {
        WhereInput::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = WhereInput>) -> Self {
        WhereInput::Or(children.into_iter().collect())
    }

    /// Nesting depth; a single condition has depth 1
    pub fn depth(&self) -> usize {
        match self {
            WhereInput::Field { .. } => 1,
            WhereInput::And(children) | WhereInput::Or(children) => {
                1 + children.iter().map(WhereInput::depth).max().unwrap_or(0)
            }
        }
    }

    /// Parses the JSON object form.
    ///
    /// ```json
    /// {"age": {"gt": 30}, "name": "Jim", "OR": [{"role": "admin"}, {"role": {"in": ["owner"]}}]}
    /// ```
    ///
    /// Keys of one object are combined with AND. A non-object field value
    /// means `equals`; an object holds operators, combined with AND.
    pub fn from_json(json: &serde_json::Value) -> StoreResult<Self> {
        let object = json.as_object().ok_or_else(|| {
            StoreError::validation(format!("where input must be an object, got {}", json))
        })?;

        let mut parts = Vec::new();
        for (key, value) in object {
            match key.as_str() {
                "AND" => parts.push(WhereInput::And(Self::children_from_json(key, value)?)),
                "OR" => parts.push(WhereInput::Or(Self::children_from_json(key, value)?)),
                field => parts.extend(Self::field_from_json(field, value)?),
            }
        }

        Ok(if parts.len() == 1 {
            parts.remove(0)
        } else {
            WhereInput::And(parts)
        })
    }

    fn children_from_json(key: &str, json: &serde_json::Value) -> StoreResult<Vec<WhereInput>> {
        match json {
            serde_json::Value::Array(items) => items.iter().map(WhereInput::from_json).collect(),
            serde_json::Value::Object(_) => Ok(vec![WhereInput::from_json(json)?]),
            other => Err(StoreError::validation(format!(
                "'{}' expects an array of where inputs, got {}",
                key, other
            ))),
        }
    }

    fn field_from_json(field: &str, json: &serde_json::Value) -> StoreResult<Vec<WhereInput>> {
        let serde_json::Value::Object(ops) = json else {
            return Ok(vec![WhereInput::Field {
                field: field.to_string(),
                condition: Condition::Equals(Value::from_json(json)),
            }]);
        };
        if ops.is_empty() {
            return Err(StoreError::validation(format!(
                "field '{}' has an empty condition",
                field
            )));
        }
        ops.iter()
            .map(|(op, value)| {
                Ok(WhereInput::Field {
                    field: field.to_string(),
                    condition: Condition::from_json(op, value)?,
                })
            })
            .collect()
    }
}

/// Starts a condition on `name`: `field("age").gt(30)`
pub fn field(name: impl Into<String>) -> FieldCondition {
    FieldCondition { field: name.into() }
}

/// Builder returned by [`field`]
#[derive(Debug, Clone)]
pub struct FieldCondition {
    field: String,
}

macro_rules! value_conditions {
    ($($method:ident => $variant:ident),* $(,)?) => {
        $(
            pub fn $method(self, value: impl Into<Value>) -> WhereInput {
                self.with(Condition::$variant(value.into()))
            }
        )*
    };
}

macro_rules! list_conditions {
    ($($method:ident => $variant:ident),* $(,)?) => {
        $(
            pub fn $method<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> WhereInput {
                self.with(Condition::$variant(values.into_iter().map(Into::into).collect()))
            }
        )*
    };
}

macro_rules! string_conditions {
    ($($method:ident => $variant:ident),* $(,)?) => {
        $(
            pub fn $method(self, value: impl Into<String>) -> WhereInput {
                self.with(Condition::$variant(value.into()))
            }
        )*
    };
}

impl FieldCondition {
    /// Applies an arbitrary condition
    pub fn with(self, condition: Condition) -> WhereInput {
        WhereInput::Field {
            field: self.field,
            condition,
        }
    }

    value_conditions! {
        equals => Equals,
        not => Not,
        gt => Gt,
        gte => Gte,
        lt => Lt,
        lte => Lte,
        has => Has,
    }

    list_conditions! {
        in_ => In,
        not_in => NotIn,
        has_every => HasEvery,
        has_some => HasSome,
    }

    string_conditions! {
        starts_with => StartsWith,
        ends_with => EndsWith,
        contains => Contains,
        not_starts_with => NotStartsWith,
        not_ends_with => NotEndsWith,
        not_contains => NotContains,
    }
}
