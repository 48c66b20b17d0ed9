//! Result ordering
//!
//! Records are ordered by the order-by field (direction applied), then by
//! id ascending. The id tie-breaker keeps the order total when the field
//! has duplicate values.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::record::Record;
use crate::schema::{TableSchema, ID_COLUMN};

use super::codec::CursorPosition;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Sort specification; defaults to `id asc`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl Default for OrderBy {
    fn default() -> Self {
        Self::asc(ID_COLUMN)
    }
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }

    /// True when ordering by id, which storage scans produce natively
    pub fn is_id(&self) -> bool {
        self.field == ID_COLUMN
    }

    /// Parses `{"age": "asc"}`
    pub fn from_json(json: &serde_json::Value) -> StoreResult<Self> {
        let invalid = || StoreError::validation(format!("invalid orderBy {}", json));
        let object = json.as_object().ok_or_else(invalid)?;
        if object.len() != 1 {
            return Err(invalid());
        }
        let (field, direction) = object.iter().next().ok_or_else(invalid)?;
        let direction = match direction.as_str() {
            Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            _ => return Err(invalid()),
        };
        Ok(Self {
            field: field.clone(),
            direction,
        })
    }

    /// Checks the field exists and is sortable
    pub fn validate(&self, table: &TableSchema) -> StoreResult<()> {
        let column_type = table.field_type(&self.field).ok_or_else(|| {
            StoreError::validation(format!(
                "cannot order by unknown field '{}' in table '{}'",
                self.field, table.name
            ))
        })?;
        if !column_type.is_sortable() {
            return Err(StoreError::validation(format!(
                "cannot order by {} field '{}'",
                column_type, self.field
            )));
        }
        Ok(())
    }
}

/// Total order of records under `order`
pub fn compare(a: &Record, b: &Record, order: &OrderBy) -> Ordering {
    order
        .direction
        .apply(a.value_of(&order.field).cmp(&b.value_of(&order.field)))
        .then_with(|| a.id().cmp(b.id()))
}

/// Position of `record` relative to a cursor under `order`
pub fn compare_to_position(
    record: &Record,
    position: &CursorPosition,
    order: &OrderBy,
) -> Ordering {
    order
        .direction
        .apply(record.value_of(&order.field).as_ref().cmp(&position.value))
        .then_with(|| record.id().cmp(&position.id))
}
