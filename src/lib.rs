//! aerostore - A typed record store query engine
//!
//! Records live in schema-declared tables and are addressed by a unique id.
//! Reads go through the query executor (filter, sort, cursor pagination),
//! writes through the mutation executor (atomic single-record operations and
//! batches). Both run against a transactional key-range storage backend.
//!
//! # Usage
//!
//! ```ignore
//! use aerostore::{ColumnDef, IdType, RecordData, Schema, Store, TableSchema};
//!
//! let schema = Schema::new().table(
//!     TableSchema::new("Person", IdType::String).column(ColumnDef::int("age")),
//! );
//! let store = Store::in_memory(schema)?;
//! let people = store.table("Person")?;
//! people.create("Jim", RecordData::new().set("age", 34)).await?;
//! ```

pub mod config;
pub mod cursor;
pub mod deadline;
pub mod error;
pub mod executor;
pub mod filter;
pub mod mutation;
pub mod observability;
pub mod record;
pub mod schema;
pub mod storage;
pub mod store;

pub use config::{BatchAtomicity, StoreConfig};
pub use cursor::{decode_cursor, encode_cursor, CursorPosition, OrderBy, SortDirection};
pub use error::{StoreError, StoreErrorCode, StoreResult};
pub use executor::{FindManyArgs, Page, PageInfo, ScanPlan};
pub use filter::{field, CompiledPredicate, Condition, WhereInput};
pub use mutation::UpdateInput;
pub use record::{Hex, Record, RecordData, RecordId, Value};
pub use schema::{ColumnDef, ColumnType, IdType, Schema, TableSchema};
pub use storage::{MemoryStorage, StorageBackend};
pub use store::{Store, TableHandle};
