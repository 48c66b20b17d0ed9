//! Result types for query execution

use serde::{Deserialize, Serialize};

use crate::record::Record;
use crate::storage::ScanRange;

/// Pagination state of a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Cursor of the first item
    pub start_cursor: Option<String>,
    /// Cursor of the last item
    pub end_cursor: Option<String>,
    pub has_previous_page: bool,
    pub has_next_page: bool,
}

/// One page of `find_many` results, in result order
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    pub page_info: PageInfo,
}

impl Page {
    /// The page returned when nothing matches
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            page_info: PageInfo::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ids of the items, in order
    pub fn ids(&self) -> Vec<String> {
        self.items.iter().map(|r| r.id().to_string()).collect()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "items": self.items.iter().map(Record::to_json).collect::<Vec<_>>(),
            "pageInfo": serde_json::to_value(&self.page_info).unwrap_or_default(),
        })
    }
}

/// How a query reaches its records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStrategy {
    /// Ordered by id: a bounded storage scan yields result order directly
    Indexed,
    /// Ordered by another field: matches are collected and sorted in memory
    Sorted,
}

impl ScanStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStrategy::Indexed => "indexed",
            ScanStrategy::Sorted => "sorted",
        }
    }
}

/// Output of `explain`
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPlan {
    /// Id range the storage scan is restricted to
    pub range: ScanRange,
    pub strategy: ScanStrategy,
    /// Whether records in `range` are still filtered by the predicate
    pub residual_filter: bool,
}
