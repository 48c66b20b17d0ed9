//! Opaque pagination cursors
//!
//! Format: `v1.` followed by URL-safe base64 (no padding) of
//! `payload ++ crc32(payload)`, where the payload is the JSON encoding of
//! the typed `(value, id)` pair and the checksum is 4 bytes big-endian.
//!
//! Encoding is deterministic: the same record and order always produce the
//! same cursor, across processes.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::record::{Record, RecordId, Value};

use super::checksum::{compute_checksum, verify_checksum};
use super::order::OrderBy;

const CURSOR_VERSION: &str = "v1.";
const CHECKSUM_LEN: usize = 4;

/// Resume position: the order-by value and id of a boundary record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPosition {
    pub value: Value,
    pub id: RecordId,
}

impl CursorPosition {
    /// Position of `record` under `order`
    pub fn of(record: &Record, order: &OrderBy) -> Self {
        Self {
            value: record.value_of(&order.field).into_owned(),
            id: record.id().clone(),
        }
    }
}

/// Encodes the position of `record` under `order`
pub fn encode_cursor(record: &Record, order: &OrderBy) -> String {
    encode_position(&CursorPosition::of(record, order))
}

fn encode_position(position: &CursorPosition) -> String {
    // Map keys are strings and floats are encoded as bits, so this cannot fail
    let mut bytes = serde_json::to_vec(position).unwrap_or_default();
    let checksum = compute_checksum(&bytes);
    bytes.extend_from_slice(&checksum.to_be_bytes());
    format!("{}{}", CURSOR_VERSION, URL_SAFE_NO_PAD.encode(bytes))
}

/// Decodes a cursor produced by `encode_cursor`
pub fn decode_cursor(cursor: &str) -> StoreResult<CursorPosition> {
    let encoded = cursor
        .strip_prefix(CURSOR_VERSION)
        .ok_or_else(|| StoreError::invalid_cursor("unknown cursor version"))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| StoreError::invalid_cursor(format!("corrupt encoding: {}", e)))?;
    if bytes.len() <= CHECKSUM_LEN {
        return Err(StoreError::invalid_cursor("cursor is truncated"));
    }

    let (payload, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    let mut expected = [0u8; CHECKSUM_LEN];
    expected.copy_from_slice(checksum);
    if !verify_checksum(payload, u32::from_be_bytes(expected)) {
        return Err(StoreError::invalid_cursor("checksum mismatch"));
    }

    serde_json::from_slice(payload)
        .map_err(|e| StoreError::invalid_cursor(format!("invalid payload: {}", e)))
}
