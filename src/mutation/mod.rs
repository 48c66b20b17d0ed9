//! Mutation Executor subsystem for aerostore
//!
//! # Design Principles
//!
//! - One backend transaction per single-record operation
//! - Schema validation of static input happens before storage access
//! - Update functions run inside the transaction that writes their result
//! - Reference values are checked against the target table at write time
//! - Batch atomicity of `update_many` is chosen by the caller's config

mod executor;
mod input;

pub use executor::MutationExecutor;
pub use input::{UpdateFn, UpdateInput};
