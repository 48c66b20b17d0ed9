//! Store error types
//!
//! Error codes:
//! - AERO_VALIDATION_FAILED (malformed filter, sort, limit, cursor arguments or data)
//! - AERO_RECORD_NOT_FOUND
//! - AERO_UNIQUE_CONSTRAINT
//! - AERO_REFERENCE_VIOLATION
//! - AERO_INVALID_CURSOR
//! - AERO_STORAGE_FAILED
//! - AERO_OPERATION_TIMEOUT

use std::fmt;

use thiserror::Error;

use crate::storage::StorageError;

/// Stable error codes, one per error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorCode {
    /// Malformed arguments or data
    ValidationFailed,
    /// Operation requires an existing record
    RecordNotFound,
    /// Duplicate id on create
    UniqueConstraint,
    /// Reference column points at a missing id
    ReferenceViolation,
    /// Cursor string could not be decoded
    InvalidCursor,
    /// Backend failure
    StorageFailed,
    /// Caller deadline exceeded
    OperationTimeout,
}

impl StoreErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StoreErrorCode::ValidationFailed => "AERO_VALIDATION_FAILED",
            StoreErrorCode::RecordNotFound => "AERO_RECORD_NOT_FOUND",
            StoreErrorCode::UniqueConstraint => "AERO_UNIQUE_CONSTRAINT",
            StoreErrorCode::ReferenceViolation => "AERO_REFERENCE_VIOLATION",
            StoreErrorCode::InvalidCursor => "AERO_INVALID_CURSOR",
            StoreErrorCode::StorageFailed => "AERO_STORAGE_FAILED",
            StoreErrorCode::OperationTimeout => "AERO_OPERATION_TIMEOUT",
        }
    }

    /// Returns true if the caller can fix the request and retry
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            StoreErrorCode::StorageFailed | StoreErrorCode::OperationTimeout
        )
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by every store operation
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("record '{id}' not found in table '{table}'")]
    NotFound { table: String, id: String },

    #[error("record '{id}' already exists in table '{table}'")]
    UniqueConstraint { table: String, id: String },

    #[error("reference violation: {table}.{column} = {value} has no matching id in table '{target}'")]
    Reference {
        table: String,
        column: String,
        target: String,
        value: String,
    },

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("operation timed out")]
    Timeout,
}

impl StoreError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(table: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            table: table.into(),
            id: id.to_string(),
        }
    }

    /// Create a unique constraint error
    pub fn unique_constraint(table: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::UniqueConstraint {
            table: table.into(),
            id: id.to_string(),
        }
    }

    /// Create an invalid cursor error
    pub fn invalid_cursor(reason: impl Into<String>) -> Self {
        Self::InvalidCursor(reason.into())
    }

    /// Returns the error code
    pub fn code(&self) -> StoreErrorCode {
        match self {
            StoreError::Validation(_) => StoreErrorCode::ValidationFailed,
            StoreError::NotFound { .. } => StoreErrorCode::RecordNotFound,
            StoreError::UniqueConstraint { .. } => StoreErrorCode::UniqueConstraint,
            StoreError::Reference { .. } => StoreErrorCode::ReferenceViolation,
            StoreError::InvalidCursor(_) => StoreErrorCode::InvalidCursor,
            StoreError::Storage(_) => StoreErrorCode::StorageFailed,
            StoreError::Timeout => StoreErrorCode::OperationTimeout,
        }
    }

    /// Returns the string code
    pub fn code_str(&self) -> &'static str {
        self.code().code()
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
