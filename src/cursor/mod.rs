//! Sort & cursor codec
//!
//! `compare` defines the total order of a result set; cursors record a
//! position in that order as an opaque, versioned string. Cursors are
//! exclusive: paging `after` a cursor never returns the record it names.
//!
//! Cursors do not carry the filter or order that produced them. Reusing a
//! cursor with a different filter or order resumes at the cursor's
//! `(value, id)` position under the new order.

mod checksum;
mod codec;
mod order;

pub use codec::{decode_cursor, encode_cursor, CursorPosition};
pub use order::{compare, compare_to_position, OrderBy, SortDirection};
