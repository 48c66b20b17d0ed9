//! Filter evaluator
//!
//! `WhereInput` trees are compiled against a table schema into a
//! `CompiledPredicate`: a pure function over records plus an id range used
//! to prune storage scans. The predicate alone decides membership; the
//! range only narrows what is scanned.

mod ast;
mod bounds;
mod compiler;
mod predicate;

pub use ast::{field, Condition, FieldCondition, WhereInput};
pub use compiler::{compile, MAX_FILTER_DEPTH};
pub use predicate::CompiledPredicate;
