//! Value coercion and record validation against a table schema
//!
//! Validation semantics:
//! - Every non-nullable column has a non-null value
//! - No undeclared columns exist
//! - Values match the declared type after coercion
//! - The id never changes
//!
//! Accepted coercions: int → bigint, int → float, string → bigint
//! (decimal), string → hex, string → enum variant, list elements
//! recursively, anything → json. Everything else is rejected.

use std::collections::BTreeMap;

use num_bigint::BigInt;

use crate::error::{StoreError, StoreResult};
use crate::record::{Hex, Record, RecordData, RecordId, Value};

use super::types::{ColumnType, IdType, TableSchema, ID_COLUMN};

/// Coerces a value to a column type. Null passes through unchanged.
pub fn coerce_value(value: Value, column_type: &ColumnType) -> Result<Value, String> {
    if value.is_null() {
        return Ok(value);
    }

    match (column_type, value) {
        (ColumnType::String, v @ Value::String(_)) => Ok(v),
        (ColumnType::Int, v @ Value::Int(_)) => Ok(v),
        (ColumnType::BigInt, v @ Value::BigInt(_)) => Ok(v),
        (ColumnType::BigInt, Value::Int(i)) => Ok(Value::BigInt(BigInt::from(i))),
        (ColumnType::BigInt, Value::String(s)) => s
            .parse::<BigInt>()
            .map(Value::BigInt)
            .map_err(|_| format!("'{}' is not a decimal integer", s)),
        (ColumnType::Hex, v @ Value::Hex(_)) => Ok(v),
        (ColumnType::Hex, Value::String(s)) => Hex::parse(&s).map(Value::Hex),
        (ColumnType::Boolean, v @ Value::Boolean(_)) => Ok(v),
        (ColumnType::Float, v @ Value::Float(_)) => Ok(v),
        (ColumnType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
        (ColumnType::Enum { values }, Value::String(s)) => {
            if values.iter().any(|v| *v == s) {
                Ok(Value::String(s))
            } else {
                Err(format!(
                    "'{}' is not one of the enum variants [{}]",
                    s,
                    values.join(", ")
                ))
            }
        }
        (ColumnType::List { element }, Value::List(items)) => items
            .into_iter()
            .map(|item| {
                if item.is_null() {
                    return Err("list elements must not be null".to_string());
                }
                coerce_value(item, element)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        (ColumnType::Json, v @ Value::Json(_)) => Ok(v),
        (ColumnType::Json, other) => Ok(Value::Json(other.to_json())),
        (expected, other) => Err(format!(
            "expected {}, got {} ({})",
            expected,
            other.type_name(),
            other
        )),
    }
}

/// Coerces a value to an id of the given kind
pub fn coerce_id(value: Value, id_type: IdType) -> StoreResult<RecordId> {
    if value.is_null() {
        return Err(StoreError::validation("id must not be null"));
    }
    let coerced = coerce_value(value, &id_type.column_type())
        .map_err(|e| StoreError::validation(format!("invalid id: {}", e)))?;
    RecordId::from_value(&coerced)
        .ok_or_else(|| StoreError::validation(format!("invalid id: {}", coerced)))
}

/// A reference value that must match an existing id in `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceCheck {
    pub column: String,
    pub target: String,
    pub id: RecordId,
}

/// Validates records and patches for one table.
///
/// The validator does not touch storage. Reference existence is checked by
/// the mutation executor inside its transaction using `references`.
pub struct SchemaValidator<'a> {
    table: &'a TableSchema,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(table: &'a TableSchema) -> Self {
        Self { table }
    }

    /// Coerces a caller-supplied id to this table's id kind
    pub fn coerce_id(&self, id: Value) -> StoreResult<RecordId> {
        coerce_id(id, self.table.id_type)
    }

    /// Builds a complete record from create data.
    ///
    /// Nullable columns absent from `data` are stored as null.
    pub fn validate_create(&self, id: RecordId, data: RecordData) -> StoreResult<Record> {
        let mut values = self.coerce_columns(Some(&id), data)?;

        for column in &self.table.columns {
            match values.get(&column.name) {
                Some(v) if !v.is_null() => {}
                _ if column.nullable => {
                    values.entry(column.name.clone()).or_insert(Value::Null);
                }
                _ => {
                    return Err(StoreError::validation(format!(
                        "missing required column '{}.{}'",
                        self.table.name, column.name
                    )))
                }
            }
        }

        Ok(Record::new(id, values))
    }

    /// Validates an update patch for the record `id`
    pub fn validate_patch(
        &self,
        id: &RecordId,
        patch: RecordData,
    ) -> StoreResult<BTreeMap<String, Value>> {
        let values = self.coerce_columns(Some(id), patch)?;
        self.check_nullability(values)
    }

    /// Validates a patch applied to many records at once. Such a patch
    /// cannot name `id`.
    pub fn validate_batch_patch(&self, patch: RecordData) -> StoreResult<BTreeMap<String, Value>> {
        let values = self.coerce_columns(None, patch)?;
        self.check_nullability(values)
    }

    fn check_nullability(
        &self,
        values: BTreeMap<String, Value>,
    ) -> StoreResult<BTreeMap<String, Value>> {
        for (name, value) in &values {
            if value.is_null() {
                let nullable = self
                    .table
                    .get_column(name)
                    .map(|c| c.nullable)
                    .unwrap_or(false);
                if !nullable {
                    return Err(StoreError::validation(format!(
                        "column '{}.{}' is not nullable",
                        self.table.name, name
                    )));
                }
            }
        }

        Ok(values)
    }

    /// Returns the non-null reference values among `values`
    pub fn references(&self, values: &BTreeMap<String, Value>) -> Vec<ReferenceCheck> {
        self.table
            .columns
            .iter()
            .filter_map(|column| {
                let reference = column.references.as_ref()?;
                let id = RecordId::from_value(values.get(&column.name)?)?;
                Some(ReferenceCheck {
                    column: column.name.clone(),
                    target: reference.table.clone(),
                    id,
                })
            })
            .collect()
    }

    fn coerce_columns(
        &self,
        id: Option<&RecordId>,
        data: RecordData,
    ) -> StoreResult<BTreeMap<String, Value>> {
        let mut values = BTreeMap::new();

        for (name, value) in data {
            if name == ID_COLUMN {
                let given = self.coerce_id(value)?;
                let Some(id) = id else {
                    return Err(StoreError::validation(format!(
                        "ids of '{}' records cannot be changed by a batch update",
                        self.table.name
                    )));
                };
                if given != *id {
                    return Err(StoreError::validation(format!(
                        "id of '{}' record '{}' cannot be changed to '{}'",
                        self.table.name, id, given
                    )));
                }
                continue;
            }

            let column = self.table.get_column(&name).ok_or_else(|| {
                StoreError::validation(format!(
                    "unknown column '{}' in table '{}'",
                    name, self.table.name
                ))
            })?;

            let coerced = coerce_value(value, &column.column_type).map_err(|e| {
                StoreError::validation(format!(
                    "column '{}.{}': {}",
                    self.table.name, name, e
                ))
            })?;
            values.insert(name, coerced);
        }

        Ok(values)
    }
}
