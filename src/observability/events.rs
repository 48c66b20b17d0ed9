//! Observable store events
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events in aerostore
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Store opened against a backend
    StoreOpen,
    /// Configuration loaded from disk
    ConfigLoaded,

    // Writes
    RecordCreated,
    RecordUpdated,
    RecordDeleted,
    /// `create_many` committed
    BatchCreated,
    /// `update_many` finished
    BatchUpdated,
    /// A write failed and its transaction was discarded
    TransactionRolledBack,

    // Reads
    QueryExecuted,
    /// Request failed validation before touching storage
    QueryRejected,

    /// Deadline exceeded
    OperationTimeout,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreOpen => "STORE_OPEN",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::RecordCreated => "RECORD_CREATED",
            Event::RecordUpdated => "RECORD_UPDATED",
            Event::RecordDeleted => "RECORD_DELETED",
            Event::BatchCreated => "BATCH_CREATED",
            Event::BatchUpdated => "BATCH_UPDATED",
            Event::TransactionRolledBack => "TRANSACTION_ROLLED_BACK",
            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::QueryRejected => "QUERY_REJECTED",
            Event::OperationTimeout => "OPERATION_TIMEOUT",
        }
    }

    /// Default severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::QueryRejected | Event::TransactionRolledBack | Event::OperationTimeout => {
                Severity::Warn
            }
            Event::QueryExecuted => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::StoreOpen,
            Event::ConfigLoaded,
            Event::RecordCreated,
            Event::RecordUpdated,
            Event::RecordDeleted,
            Event::BatchCreated,
            Event::BatchUpdated,
            Event::TransactionRolledBack,
            Event::QueryExecuted,
            Event::QueryRejected,
            Event::OperationTimeout,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_failure_events_warn() {
        assert_eq!(Event::QueryRejected.severity(), Severity::Warn);
        assert_eq!(Event::OperationTimeout.severity(), Severity::Warn);
        assert_eq!(Event::RecordCreated.severity(), Severity::Info);
    }

    #[test]
    fn test_event_display() {
        assert_eq!(Event::BatchCreated.to_string(), "BATCH_CREATED");
    }
}
