//! Storage backend error types
//!
//! Error codes:
//! - AERO_STORAGE_UNAVAILABLE (backend connection lost or closed)
//! - AERO_STORAGE_READ_FAILED
//! - AERO_STORAGE_WRITE_FAILED
//! - AERO_STORAGE_UNKNOWN_TABLE

use std::fmt;

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Backend cannot be reached
    AeroStorageUnavailable,
    /// Read or scan failed
    AeroStorageReadFailed,
    /// Write or commit failed
    AeroStorageWriteFailed,
    /// Table is not registered with the backend
    AeroStorageUnknownTable,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::AeroStorageUnavailable => "AERO_STORAGE_UNAVAILABLE",
            StorageErrorCode::AeroStorageReadFailed => "AERO_STORAGE_READ_FAILED",
            StorageErrorCode::AeroStorageWriteFailed => "AERO_STORAGE_WRITE_FAILED",
            StorageErrorCode::AeroStorageUnknownTable => "AERO_STORAGE_UNKNOWN_TABLE",
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with code, message and optional context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
}

impl StorageError {
    /// Backend cannot be reached
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::AeroStorageUnavailable,
            message: message.into(),
            details: None,
        }
    }

    /// Read or scan failed
    pub fn read_failed(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::AeroStorageReadFailed,
            message: message.into(),
            details: None,
        }
    }

    /// Write or commit failed
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::AeroStorageWriteFailed,
            message: message.into(),
            details: None,
        }
    }

    /// Table is not registered with the backend
    pub fn unknown_table(table: &str) -> Self {
        Self {
            code: StorageErrorCode::AeroStorageUnknownTable,
            message: "table is not registered".to_string(),
            details: Some(format!("table: {}", table)),
        }
    }

    /// Attaches context to the error
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
