//! Compilation of `WhereInput` trees against a table schema
//!
//! Compilation rejects unknown fields, operators that do not apply to the
//! field's type, and operands that cannot be coerced to it. Operands are
//! coerced once here, so evaluation compares like with like.

use crate::error::{StoreError, StoreResult};
use crate::record::Value;
use crate::schema::{coerce_value, ColumnType, TableSchema};

use super::ast::{Condition, WhereInput};
use super::bounds::{is_exact, lower};
use super::predicate::{CompiledPredicate, FieldRef, Node};

/// Deepest accepted filter tree
pub const MAX_FILTER_DEPTH: usize = 32;

/// Compiles `input` against `table`
pub fn compile(input: &WhereInput, table: &TableSchema) -> StoreResult<CompiledPredicate> {
    let depth = input.depth();
    if depth > MAX_FILTER_DEPTH {
        return Err(StoreError::validation(format!(
            "filter nesting depth {} exceeds the maximum of {}",
            depth, MAX_FILTER_DEPTH
        )));
    }

    let root = compile_node(input, table)?;
    let range = lower(&root);
    let exact = is_exact(&root);
    Ok(CompiledPredicate { root, range, exact })
}

fn compile_node(input: &WhereInput, table: &TableSchema) -> StoreResult<Node> {
    match input {
        WhereInput::Field { field, condition } => compile_leaf(field, condition, table),
        WhereInput::And(children) => Ok(Node::And(
            children
                .iter()
                .map(|c| compile_node(c, table))
                .collect::<StoreResult<_>>()?,
        )),
        WhereInput::Or(children) => Ok(Node::Or(
            children
                .iter()
                .map(|c| compile_node(c, table))
                .collect::<StoreResult<_>>()?,
        )),
    }
}

fn compile_leaf(field: &str, condition: &Condition, table: &TableSchema) -> StoreResult<Node> {
    let column_type = table.field_type(field).ok_or_else(|| {
        StoreError::validation(format!(
            "unknown field '{}' in table '{}'",
            field, table.name
        ))
    })?;
    let operand = Operand {
        field,
        op: condition.op_name(),
        column_type: &column_type,
    };

    let condition = match condition {
        Condition::Equals(v) => Condition::Equals(operand.coerce(v)?),
        Condition::Not(v) => Condition::Not(operand.coerce(v)?),
        Condition::In(values) | Condition::NotIn(values) => {
            if matches!(column_type, ColumnType::List { .. } | ColumnType::Json) {
                return Err(operand.unsupported());
            }
            let coerced = operand.coerce_all(values, &column_type)?;
            if matches!(condition, Condition::In(_)) {
                Condition::In(coerced)
            } else {
                Condition::NotIn(coerced)
            }
        }
        Condition::Gt(v) | Condition::Gte(v) | Condition::Lt(v) | Condition::Lte(v) => {
            if !column_type.is_ordered() {
                return Err(operand.unsupported());
            }
            let v = operand.coerce_non_null(v, &column_type)?;
            match condition {
                Condition::Gt(_) => Condition::Gt(v),
                Condition::Gte(_) => Condition::Gte(v),
                Condition::Lt(_) => Condition::Lt(v),
                _ => Condition::Lte(v),
            }
        }
        Condition::StartsWith(_)
        | Condition::EndsWith(_)
        | Condition::Contains(_)
        | Condition::NotStartsWith(_)
        | Condition::NotEndsWith(_)
        | Condition::NotContains(_) => {
            if column_type != ColumnType::String {
                return Err(operand.unsupported());
            }
            condition.clone()
        }
        Condition::Has(v) => {
            let element = operand.list_element()?;
            Condition::Has(operand.coerce_non_null(v, element)?)
        }
        Condition::HasEvery(values) => {
            let element = operand.list_element()?;
            Condition::HasEvery(operand.coerce_all(values, element)?)
        }
        Condition::HasSome(values) => {
            let element = operand.list_element()?;
            Condition::HasSome(operand.coerce_all(values, element)?)
        }
    };

    Ok(Node::Leaf {
        field: FieldRef::resolve(field),
        condition,
    })
}

struct Operand<'a> {
    field: &'a str,
    op: &'static str,
    column_type: &'a ColumnType,
}

impl Operand<'_> {
    fn unsupported(&self) -> StoreError {
        StoreError::validation(format!(
            "operator '{}' is not supported on {} field '{}'",
            self.op, self.column_type, self.field
        ))
    }

    fn list_element(&self) -> StoreResult<&ColumnType> {
        match self.column_type {
            ColumnType::List { element } => Ok(&**element),
            _ => Err(self.unsupported()),
        }
    }

    fn coerce(&self, value: &Value) -> StoreResult<Value> {
        self.coerce_to(value, self.column_type)
    }

    fn coerce_to(&self, value: &Value, column_type: &ColumnType) -> StoreResult<Value> {
        coerce_value(value.clone(), column_type).map_err(|e| {
            StoreError::validation(format!(
                "invalid '{}' operand for field '{}': {}",
                self.op, self.field, e
            ))
        })
    }

    fn coerce_non_null(&self, value: &Value, column_type: &ColumnType) -> StoreResult<Value> {
        if value.is_null() {
            return Err(StoreError::validation(format!(
                "operator '{}' on field '{}' needs a non-null operand",
                self.op, self.field
            )));
        }
        self.coerce_to(value, column_type)
    }

    fn coerce_all(&self, values: &[Value], column_type: &ColumnType) -> StoreResult<Vec<Value>> {
        values
            .iter()
            .map(|v| self.coerce_to(v, column_type))
            .collect()
    }
}
