//! Error types shared across the event subsystem.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::payload::EventType;

/// Errors raised by aggregates and by event handlers.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An aggregate was not found.
    #[error("aggregate not found: {0}")]
    AggregateNotFound(Uuid),

    /// An event history skipped or repeated a version.
    #[error("version conflict on aggregate {aggregate_id}: expected version {expected}, found {actual}")]
    VersionConflict {
        /// The aggregate whose history is inconsistent.
        aggregate_id: Uuid,
        /// The version that should have come next.
        expected: i64,
        /// The version that was found.
        actual: i64,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure error inside a handler (mail gateway, sink, ...).
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}

/// Errors returned synchronously by the bus, the registry, the store and the
/// narrowing helper.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The bus has not been started, or has been stopped.
    #[error("event bus is not running")]
    NotRunning,

    /// `start` was called on a running bus.
    #[error("event bus is already running")]
    AlreadyRunning,

    /// The intake queue is full and no wait was permitted.
    #[error("event queue is full (capacity {capacity})")]
    QueueFull {
        /// Configured queue capacity.
        capacity: usize,
    },

    /// The intake queue stayed full for the whole publish timeout.
    #[error("timed out after {0:?} waiting for queue capacity")]
    Timeout(Duration),

    /// An event with this identifier is already stored.
    #[error("duplicate event id: {0}")]
    DuplicateId(Uuid),

    /// No stored event has this identifier.
    #[error("event not found: {0}")]
    NotFound(Uuid),

    /// The same handler instance is already subscribed to this type.
    #[error("handler '{handler}' is already subscribed to {event_type}")]
    AlreadySubscribed {
        /// Event type of the rejected subscription.
        event_type: EventType,
        /// Name of the handler.
        handler: String,
    },

    /// The handler instance is not subscribed to this type.
    #[error("handler '{handler}' is not subscribed to {event_type}")]
    HandlerNotFound {
        /// Event type that was looked up.
        event_type: EventType,
        /// Name of the handler.
        handler: String,
    },

    /// A payload was narrowed to the wrong type.
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        /// Tag the caller asked for.
        expected: EventType,
        /// Tag the record actually carries.
        actual: EventType,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_names_both_tags() {
        let err = EventError::TypeMismatch {
            expected: EventType::TaskCreated,
            actual: EventType::UserRegistered,
        };

        let message = err.to_string();
        assert!(message.contains("TaskCreated"));
        assert!(message.contains("UserRegistered"));
    }

    #[test]
    fn test_subscription_errors_name_the_handler() {
        let err = EventError::AlreadySubscribed {
            event_type: EventType::TaskAssigned,
            handler: "notification".to_owned(),
        };

        assert_eq!(
            err.to_string(),
            "handler 'notification' is already subscribed to TaskAssigned"
        );
    }
}
