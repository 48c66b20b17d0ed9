//! Lowering of compiled filters to id scan ranges
//!
//! The lowered range is a superset of the matching ids:
//! - Conditions on `id` give bounds
//! - `AND` intersects, `OR` takes the hull
//! - Anything else is unbounded

use std::ops::Bound;

use crate::record::{RecordId, Value};
use crate::storage::ScanRange;

use super::ast::Condition;
use super::predicate::{FieldRef, Node};

/// Returns the id range a record must fall in to match `node`
pub(crate) fn lower(node: &Node) -> ScanRange {
    match node {
        Node::Leaf {
            field: FieldRef::Id,
            condition,
        } => lower_id_condition(condition),
        Node::Leaf { .. } => ScanRange::full(),
        Node::And(children) => children
            .iter()
            .fold(ScanRange::full(), |acc, child| acc.intersect(&lower(child))),
        Node::Or(children) => children
            .iter()
            .fold(ScanRange::Empty, |acc, child| acc.hull(&lower(child))),
    }
}

/// Returns true when `lower(node)` contains exactly the matching ids
pub(crate) fn is_exact(node: &Node) -> bool {
    match node {
        Node::Leaf {
            field: FieldRef::Id,
            condition,
        } => match condition {
            Condition::Equals(_)
            | Condition::Gt(_)
            | Condition::Gte(_)
            | Condition::Lt(_)
            | Condition::Lte(_) => true,
            Condition::In(values) => values.len() <= 1,
            _ => false,
        },
        Node::Leaf { .. } => false,
        Node::And(children) => children.iter().all(is_exact),
        Node::Or(children) => children.is_empty(),
    }
}

fn lower_id_condition(condition: &Condition) -> ScanRange {
    match condition {
        Condition::Equals(value) => point(value),
        Condition::In(values) => values
            .iter()
            .fold(ScanRange::Empty, |acc, v| acc.hull(&point(v))),
        Condition::Gt(value) => bounded(value, |id| (Bound::Excluded(id), Bound::Unbounded)),
        Condition::Gte(value) => bounded(value, |id| (Bound::Included(id), Bound::Unbounded)),
        Condition::Lt(value) => bounded(value, |id| (Bound::Unbounded, Bound::Excluded(id))),
        Condition::Lte(value) => bounded(value, |id| (Bound::Unbounded, Bound::Included(id))),
        Condition::StartsWith(prefix) => ScanRange::new(
            Bound::Included(RecordId::String(prefix.clone())),
            Bound::Unbounded,
        ),
        _ => ScanRange::full(),
    }
}

fn point(value: &Value) -> ScanRange {
    // Ids are never null, so `id = null` matches nothing
    RecordId::from_value(value).map_or(ScanRange::Empty, ScanRange::point)
}

fn bounded(
    value: &Value,
    bounds: impl FnOnce(RecordId) -> (Bound<RecordId>, Bound<RecordId>),
) -> ScanRange {
    match RecordId::from_value(value) {
        Some(id) => {
            let (start, end) = bounds(id);
            ScanRange::new(start, end)
        }
        None => ScanRange::full(),
    }
}
