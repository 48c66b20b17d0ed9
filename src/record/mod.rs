//! Typed records and values
//!
//! - `Value`: a typed column value with a total order
//! - `RecordId`: the per-table identifier
//! - `Record`: id plus column values, as stored
//! - `RecordData`: caller-supplied column values or patches

mod hex;
mod id;
#[allow(clippy::module_inception)]
mod record;
mod value;

pub use hex::Hex;
pub use id::RecordId;
pub use record::{Record, RecordData};
pub use value::Value;
