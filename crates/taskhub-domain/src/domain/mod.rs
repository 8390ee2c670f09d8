//! Aggregate roots.

pub mod project;
pub mod task;
pub mod user;

use taskhub_core::clock::Clock;
use taskhub_core::event::{EventMetadata, EventRecord};
use taskhub_core::payload::EventPayload;
use uuid::Uuid;

/// Builds the record for an event raised by an aggregate.
///
/// The correlation id doubles as the causation id because every event here
/// is caused directly by the command carrying it.
pub(crate) fn raise(
    aggregate_id: Uuid,
    version: i64,
    payload: EventPayload,
    correlation_id: Uuid,
    clock: &dyn Clock,
) -> EventRecord {
    EventRecord::from_parts(
        EventMetadata {
            event_id: Uuid::new_v4(),
            aggregate_id,
            version,
            correlation_id,
            causation_id: correlation_id,
            occurred_at: clock.now(),
        },
        payload,
    )
}
