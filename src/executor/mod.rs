//! Query Executor subsystem for aerostore
//!
//! The executor turns a filter, an order and a cursor into one page of
//! records and its `PageInfo`.
//!
//! # Design Principles
//!
//! - Deterministic: the same data and arguments give the same page
//! - Arguments are validated before any storage access
//! - Storage scans are pruned to the filter's id range; the predicate is
//!   always re-applied to what the scan returns
//! - Every scan step checks the operation deadline

mod executor;
mod result;
mod sorter;

pub use executor::{FindManyArgs, QueryExecutor};
pub use result::{Page, PageInfo, ScanPlan, ScanStrategy};
