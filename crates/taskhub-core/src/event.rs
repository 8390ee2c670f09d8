//! The event record: the immutable unit of data flowing through the bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::payload::{AggregateType, EventPayload, EventType};

/// Metadata attached to every event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Aggregate that raised this event.
    pub aggregate_id: Uuid,
    /// Per-aggregate sequence number, starting at 1.
    pub version: i64,
    /// Correlation ID for tracing a command through its effects.
    pub correlation_id: Uuid,
    /// Causation ID linking this event to the event/command that caused it.
    pub causation_id: Uuid,
    /// Timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// A domain event: metadata plus a payload from the closed payload set.
///
/// Fields are private; once built a record can only be read. The routing tag
/// and the aggregate type are derived from the payload variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    metadata: EventMetadata,
    payload: EventPayload,
}

impl EventRecord {
    /// Creates a record with a fresh random identifier and nil correlation.
    #[must_use]
    pub fn new(
        aggregate_id: Uuid,
        version: i64,
        payload: EventPayload,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                aggregate_id,
                version,
                correlation_id: Uuid::nil(),
                causation_id: Uuid::nil(),
                occurred_at,
            },
            payload,
        }
    }

    /// Creates a record from fully specified metadata.
    #[must_use]
    pub fn from_parts(metadata: EventMetadata, payload: EventPayload) -> Self {
        Self { metadata, payload }
    }

    /// Replaces the generated identifier. Used by tests and replays.
    #[must_use]
    pub fn with_id(mut self, event_id: Uuid) -> Self {
        self.metadata.event_id = event_id;
        self
    }

    /// Attaches correlation and causation identifiers.
    #[must_use]
    pub fn with_correlation(mut self, correlation_id: Uuid, causation_id: Uuid) -> Self {
        self.metadata.correlation_id = correlation_id;
        self.metadata.causation_id = causation_id;
        self
    }

    /// Unique event identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.metadata.event_id
    }

    /// Routing tag.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    /// Identifier of the aggregate that raised the event.
    #[must_use]
    pub fn aggregate_id(&self) -> Uuid {
        self.metadata.aggregate_id
    }

    /// Kind of aggregate that raised the event.
    #[must_use]
    pub fn aggregate_type(&self) -> AggregateType {
        self.event_type().aggregate_type()
    }

    /// Per-aggregate sequence number.
    #[must_use]
    pub fn version(&self) -> i64 {
        self.metadata.version
    }

    /// Creation timestamp.
    #[must_use]
    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.metadata.occurred_at
    }

    /// Full metadata.
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    /// Payload accessor.
    #[must_use]
    pub fn payload(&self) -> &EventPayload {
        &self.payload
    }
}
