//! Observability subsystem for aerostore
//!
//! - Structured logging (JSON lines)
//! - Typed events
//! - Per-store counters
//!
//! Observability is read-only: it never changes the outcome of an
//! operation and never fails it.
//!
//! # Usage
//!
//! ```ignore
//! use aerostore::observability::{log_event, Event, MetricsRegistry};
//!
//! log_event(Event::RecordCreated, &[("table", "Person"), ("id", "Jim")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.add_records_created(1);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log an event at its default severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
