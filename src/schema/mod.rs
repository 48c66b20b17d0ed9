//! Schema descriptor for aerostore
//!
//! Tables declare an id kind and ordered columns. The schema is consumed
//! at write time (validation and coercion of record data) and at query
//! time (field resolution and operator checks).
//!
//! # Design Principles
//!
//! - Structural validation when the store opens
//! - Only explicit, lossless coercions
//! - Reference columns point at another table's id

mod loader;
mod types;
mod validator;

pub use types::{ColumnDef, ColumnType, IdType, Reference, Schema, TableSchema, ID_COLUMN};
pub use validator::{coerce_id, coerce_value, ReferenceCheck, SchemaValidator};
