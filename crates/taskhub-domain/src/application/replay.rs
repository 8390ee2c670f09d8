//! Rebuilding aggregates from the event store.

use taskhub_core::aggregate::AggregateRoot;
use taskhub_core::error::DomainError;
use taskhub_core::store::EventStore;
use tracing::debug;
use uuid::Uuid;

/// Loads the stored history of `aggregate_id` and replays it into `A`.
///
/// The store is bounded, so a long-lived aggregate may have lost its early
/// events; that surfaces as a version conflict rather than a partial rebuild.
///
/// # Errors
///
/// Returns [`DomainError::AggregateNotFound`] if nothing is stored for the
/// aggregate and [`DomainError::VersionConflict`] if its history has gaps.
pub async fn load<A: AggregateRoot>(
    store: &dyn EventStore,
    aggregate_id: Uuid,
) -> Result<A, DomainError> {
    let history = store.get_events(aggregate_id, 1).await;
    debug!(%aggregate_id, events = history.len(), "replaying aggregate");
    A::replay(aggregate_id, &history)
}
