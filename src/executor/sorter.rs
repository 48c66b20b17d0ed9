//! In-memory ordering for non-id sorts
//!
//! Matches are sorted under the total record order, then a page window is
//! cut relative to the cursor position with binary searches.

use std::cmp::Ordering;

use crate::cursor::{compare, compare_to_position, CursorPosition, OrderBy};
use crate::record::Record;

/// A page cut from a sorted match set
#[derive(Debug)]
pub(crate) struct Window {
    pub(crate) items: Vec<Record>,
    pub(crate) has_previous: bool,
    pub(crate) has_next: bool,
}

/// Sorts records and cuts pages out of them
pub(crate) struct ResultSorter;

impl ResultSorter {
    /// Sorts records by `order`. The order is total, so the result is
    /// deterministic.
    pub(crate) fn sort(records: &mut [Record], order: &OrderBy) {
        records.sort_by(|a, b| compare(a, b, order));
    }

    /// Up to `limit` records strictly after `position`
    pub(crate) fn after(
        mut sorted: Vec<Record>,
        position: Option<&CursorPosition>,
        order: &OrderBy,
        limit: usize,
    ) -> Window {
        let start = position.map_or(0, |p| {
            sorted.partition_point(|r| compare_to_position(r, p, order) != Ordering::Greater)
        });
        let end = start.saturating_add(limit).min(sorted.len());
        let has_next = end < sorted.len();
        sorted.truncate(end);
        let items = sorted.split_off(start);
        Window {
            items,
            has_previous: start > 0,
            has_next,
        }
    }

    /// Up to `limit` records strictly before `position`, in forward order
    pub(crate) fn before(
        mut sorted: Vec<Record>,
        position: &CursorPosition,
        order: &OrderBy,
        limit: usize,
    ) -> Window {
        let end = sorted
            .partition_point(|r| compare_to_position(r, position, order) == Ordering::Less);
        let start = end.saturating_sub(limit);
        let has_next = end < sorted.len();
        sorted.truncate(end);
        let items = sorted.split_off(start);
        Window {
            items,
            has_previous: start > 0,
            has_next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordId, Value};
    use std::collections::BTreeMap;

    fn person(id: &str, age: i64) -> Record {
        let mut values = BTreeMap::new();
        values.insert("age".to_string(), Value::Int(age));
        Record::new(RecordId::from(id), values)
    }

    fn sorted() -> Vec<Record> {
        let mut records = vec![
            person("Jim", 34),
            person("Andrew", 19),
            person("Janet", 56),
            person("Ann", 34),
        ];
        ResultSorter::sort(&mut records, &OrderBy::asc("age"));
        records
    }

    fn ids(records: &[Record]) -> Vec<String> {
        records.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn test_sort_breaks_ties_by_id() {
        assert_eq!(ids(&sorted()), vec!["Andrew", "Ann", "Jim", "Janet"]);
    }

    #[test]
    fn test_first_page() {
        let window = ResultSorter::after(sorted(), None, &OrderBy::asc("age"), 2);
        assert_eq!(ids(&window.items), vec!["Andrew", "Ann"]);
        assert!(window.has_next);
        assert!(!window.has_previous);
    }

    #[test]
    fn test_after_is_exclusive() {
        let order = OrderBy::asc("age");
        let position = CursorPosition::of(&person("Ann", 34), &order);
        let window = ResultSorter::after(sorted(), Some(&position), &order, 10);
        assert_eq!(ids(&window.items), vec!["Jim", "Janet"]);
        assert!(window.has_previous);
        assert!(!window.has_next);
    }

    #[test]
    fn test_before_is_exclusive() {
        let order = OrderBy::asc("age");
        let position = CursorPosition::of(&person("Janet", 56), &order);
        let window = ResultSorter::before(sorted(), &position, &order, 2);
        assert_eq!(ids(&window.items), vec!["Ann", "Jim"]);
        assert!(window.has_previous);
        assert!(window.has_next);
    }

    #[test]
    fn test_position_of_removed_record() {
        let order = OrderBy::asc("age");
        let position = CursorPosition::of(&person("Bob", 30), &order);
        let window = ResultSorter::after(sorted(), Some(&position), &order, 10);
        assert_eq!(ids(&window.items), vec!["Ann", "Jim", "Janet"]);
        assert!(window.has_previous);
    }
}
