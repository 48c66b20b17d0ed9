//! Store configuration
//!
//! Defaults:
//! - `default_limit`: 50 records per page
//! - `max_limit`: 1000 records per page
//! - `update_many_atomicity`: per record
//! - `operation_timeout_ms`: none
//! - `log_level`: info

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::observability::{log_event, Event, Severity};

/// Atomicity of `update_many` across the matched set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchAtomicity {
    /// Each record commits on its own; earlier records stay updated when a
    /// later one fails
    #[default]
    PerRecord,
    /// The whole matched set commits or nothing does
    AllOrNothing,
}

/// Configuration of a `Store`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Page size when `limit` is omitted
    pub default_limit: usize,
    /// Largest accepted `limit`
    pub max_limit: usize,
    pub update_many_atomicity: BatchAtomicity,
    /// Per-call deadline in milliseconds
    pub operation_timeout_ms: Option<u64>,
    pub log_level: Severity,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 1000,
            update_many_atomicity: BatchAtomicity::PerRecord,
            operation_timeout_ms: None,
            log_level: Severity::Info,
        }
    }
}

impl StoreConfig {
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    pub fn with_max_limit(mut self, limit: usize) -> Self {
        self.max_limit = limit;
        self
    }

    pub fn with_update_many_atomicity(mut self, atomicity: BatchAtomicity) -> Self {
        self.update_many_atomicity = atomicity;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout_ms = Some(timeout.as_millis().min(u64::MAX as u128) as u64);
        self
    }

    pub fn with_log_level(mut self, level: Severity) -> Self {
        self.log_level = level;
        self
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout_ms.map(Duration::from_millis)
    }

    /// Rejects limits of zero and a default above the maximum
    pub fn validate(&self) -> StoreResult<()> {
        if self.max_limit == 0 {
            return Err(StoreError::validation("max_limit must be at least 1"));
        }
        if self.default_limit == 0 {
            return Err(StoreError::validation("default_limit must be at least 1"));
        }
        if self.default_limit > self.max_limit {
            return Err(StoreError::validation(format!(
                "default_limit {} exceeds max_limit {}",
                self.default_limit, self.max_limit
            )));
        }
        Ok(())
    }

    /// Loads and validates a JSON config file. Missing keys take defaults.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StoreError::validation(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: StoreConfig = serde_json::from_str(&content)
            .map_err(|e| StoreError::validation(format!("malformed config: {}", e)))?;
        config.validate()?;

        let path = path.display().to_string();
        log_event(Event::ConfigLoaded, &[("path", &path)]);
        Ok(config)
    }
}
