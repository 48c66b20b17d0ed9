//! Record identifiers
//!
//! Each table fixes one id kind at schema definition.

use std::fmt;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

use super::hex::Hex;
use super::value::Value;

/// Unique, immutable record identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RecordId {
    String(String),
    Hex(Hex),
    Int(i64),
    BigInt(BigInt),
}

impl RecordId {
    /// Returns the id as a column value
    pub fn to_value(&self) -> Value {
        match self {
            RecordId::String(s) => Value::String(s.clone()),
            RecordId::Hex(h) => Value::Hex(h.clone()),
            RecordId::Int(i) => Value::Int(*i),
            RecordId::BigInt(b) => Value::BigInt(b.clone()),
        }
    }

    /// Converts a value of an id-compatible kind. No coercion.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RecordId::String(s.clone())),
            Value::Hex(h) => Some(RecordId::Hex(h.clone())),
            Value::Int(i) => Some(RecordId::Int(*i)),
            Value::BigInt(b) => Some(RecordId::BigInt(b.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::String(s) => write!(f, "{}", s),
            RecordId::Hex(h) => write!(f, "{}", h),
            RecordId::Int(i) => write!(f, "{}", i),
            RecordId::BigInt(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::String(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId::String(value)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Int(value)
    }
}

impl From<BigInt> for RecordId {
    fn from(value: BigInt) -> Self {
        RecordId::BigInt(value)
    }
}

impl From<Hex> for RecordId {
    fn from(value: Hex) -> Self {
        RecordId::Hex(value)
    }
}

impl From<RecordId> for Value {
    fn from(value: RecordId) -> Self {
        value.to_value()
    }
}
