//! Aggregate root abstraction.

use uuid::Uuid;

use crate::error::DomainError;
use crate::event::EventRecord;

/// Trait for aggregate roots that raise events and rebuild from them.
pub trait AggregateRoot: Send + Sync + Sized {
    /// Returns the aggregate identifier.
    fn aggregate_id(&self) -> Uuid;

    /// Returns the current version (number of events applied).
    fn version(&self) -> i64;

    /// Apply an event to mutate internal state (used during replay).
    fn apply(&mut self, event: &EventRecord);

    /// Returns events raised since the last publish.
    fn uncommitted_events(&self) -> &[EventRecord];

    /// Hands over the raised events, leaving none behind.
    fn take_uncommitted_events(&mut self) -> Vec<EventRecord>;

    /// Creates an empty aggregate with the given identifier.
    fn empty(aggregate_id: Uuid) -> Self;

    /// Rebuilds an aggregate from its stored history.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::AggregateNotFound`] for an empty history and
    /// [`DomainError::VersionConflict`] when versions are not contiguous from 1.
    fn replay(aggregate_id: Uuid, history: &[EventRecord]) -> Result<Self, DomainError> {
        if history.is_empty() {
            return Err(DomainError::AggregateNotFound(aggregate_id));
        }
        let mut aggregate = Self::empty(aggregate_id);
        for event in history {
            let expected = aggregate.version() + 1;
            if event.aggregate_id() != aggregate_id || event.version() != expected {
                return Err(DomainError::VersionConflict {
                    aggregate_id,
                    expected,
                    actual: event.version(),
                });
            }
            aggregate.apply(event);
        }
        Ok(aggregate)
    }
}
