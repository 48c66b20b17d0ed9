//! Compiled predicates and their evaluation
//!
//! Evaluation rules:
//! - `equals` / `in` compare with value equality; `equals null` matches null
//! - `not` / `notIn` never match a null record value unless the operand is
//!   null (`not null` matches every non-null value)
//! - Ordered, string and list operators never match null
//! - Floats compare numerically: `-0.0` equals `0.0`, and NaN is neither
//!   equal to nor ordered against anything

use std::cmp::Ordering;

use crate::record::{Record, Value};
use crate::schema::ID_COLUMN;
use crate::storage::ScanRange;

use super::ast::Condition;

/// A field resolved against the table schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldRef {
    Id,
    Column(String),
}

impl FieldRef {
    pub(crate) fn resolve(name: &str) -> Self {
        if name == ID_COLUMN {
            FieldRef::Id
        } else {
            FieldRef::Column(name.to_string())
        }
    }

    pub(crate) fn name(&self) -> &str {
        match self {
            FieldRef::Id => ID_COLUMN,
            FieldRef::Column(name) => name,
        }
    }
}

/// Validated, coerced filter tree
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Leaf { field: FieldRef, condition: Condition },
    And(Vec<Node>),
    Or(Vec<Node>),
}

impl Node {
    pub(crate) fn eval(&self, record: &Record) -> bool {
        match self {
            Node::Leaf { field, condition } => {
                eval_condition(&record.value_of(field.name()), condition)
            }
            Node::And(children) => children.iter().all(|c| c.eval(record)),
            Node::Or(children) => children.iter().any(|c| c.eval(record)),
        }
    }
}

/// Numeric comparison for filters; `None` when the values are unordered.
///
/// `Value`'s own order is total so sorting and cursors stay deterministic,
/// but filters follow IEEE semantics for floats.
fn filter_cmp(value: &Value, operand: &Value) -> Option<Ordering> {
    match (value, operand) {
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        _ => Some(value.cmp(operand)),
    }
}

fn filter_eq(value: &Value, operand: &Value) -> bool {
    filter_cmp(value, operand) == Some(Ordering::Equal)
}

fn ordered(value: &Value, operand: &Value, accept: fn(Ordering) -> bool) -> bool {
    !value.is_null() && filter_cmp(value, operand).is_some_and(accept)
}

fn eval_condition(value: &Value, condition: &Condition) -> bool {
    match condition {
        Condition::Equals(operand) => filter_eq(value, operand),
        Condition::Not(operand) => {
            if operand.is_null() {
                !value.is_null()
            } else {
                !value.is_null() && !filter_eq(value, operand)
            }
        }
        Condition::In(set) => set.iter().any(|o| filter_eq(value, o)),
        Condition::NotIn(set) => !value.is_null() && !set.iter().any(|o| filter_eq(value, o)),
        Condition::Gt(operand) => ordered(value, operand, Ordering::is_gt),
        Condition::Gte(operand) => ordered(value, operand, Ordering::is_ge),
        Condition::Lt(operand) => ordered(value, operand, Ordering::is_lt),
        Condition::Lte(operand) => ordered(value, operand, Ordering::is_le),
        Condition::StartsWith(s) => value.as_str().is_some_and(|v| v.starts_with(s.as_str())),
        Condition::EndsWith(s) => value.as_str().is_some_and(|v| v.ends_with(s.as_str())),
        Condition::Contains(s) => value.as_str().is_some_and(|v| v.contains(s.as_str())),
        Condition::NotStartsWith(s) => value.as_str().is_some_and(|v| !v.starts_with(s.as_str())),
        Condition::NotEndsWith(s) => value.as_str().is_some_and(|v| !v.ends_with(s.as_str())),
        Condition::NotContains(s) => value.as_str().is_some_and(|v| !v.contains(s.as_str())),
        Condition::Has(operand) => value
            .as_list()
            .is_some_and(|items| items.iter().any(|i| filter_eq(i, operand))),
        Condition::HasEvery(operands) => value.as_list().is_some_and(|items| {
            operands
                .iter()
                .all(|o| items.iter().any(|i| filter_eq(i, o)))
        }),
        Condition::HasSome(operands) => value.as_list().is_some_and(|items| {
            operands
                .iter()
                .any(|o| items.iter().any(|i| filter_eq(i, o)))
        }),
    }
}

/// A filter validated against a table, ready to evaluate.
///
/// `matches` is the source of truth. `scan_range` is a superset of the ids
/// that can match, used to prune storage scans.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    pub(crate) root: Node,
    pub(crate) range: ScanRange,
    pub(crate) exact: bool,
}

impl CompiledPredicate {
    /// Predicate matching every record
    pub fn match_all() -> Self {
        Self {
            root: Node::And(Vec::new()),
            range: ScanRange::full(),
            exact: true,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.root.eval(record)
    }

    /// Ids outside this range never match
    pub fn scan_range(&self) -> &ScanRange {
        &self.range
    }

    /// False when the scan range alone decides the result
    pub fn has_residual_filter(&self) -> bool {
        !self.exact
    }
}
