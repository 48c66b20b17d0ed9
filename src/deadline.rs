//! Per-operation deadlines
//!
//! A deadline is checked at scan steps and before every commit, so an
//! expired operation stops without committing its current transaction.

use std::time::{Duration, Instant};

use crate::error::{StoreError, StoreResult};

/// Optional point in time after which an operation fails with `Timeout`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// A deadline that never expires
    pub fn none() -> Self {
        Self(None)
    }

    /// Expires `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    /// Expires `timeout` from now, or never
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or_else(Self::none, Self::after)
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Fails with `StoreError::Timeout` once expired
    pub fn check(&self) -> StoreResult<()> {
        if self.is_expired() {
            return Err(StoreError::Timeout);
        }
        Ok(())
    }
}
