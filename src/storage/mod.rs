//! Storage subsystem for aerostore
//!
//! The engine consumes storage only through `StorageBackend`: point reads,
//! ordered id-range scans and transactions. `MemoryStorage` is the
//! bundled implementation.
//!
//! # Design Principles
//!
//! - Ordered by id within each table
//! - All-or-nothing transactions, serialized by the backend
//! - Failures propagate unchanged (no retry)

mod backend;
mod errors;
mod memory;

pub use backend::{
    with_transaction, ScanControl, ScanDirection, ScanRange, ScanVisitor, StorageBackend,
    Transaction, WriteAction,
};
pub use errors::{StorageError, StorageErrorCode, StorageResult};
pub use memory::MemoryStorage;
