//! Event handler abstraction.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::event::EventRecord;
use crate::payload::EventType;

/// A subscriber invoked by the dispatcher for every matching event.
///
/// Handlers may be invoked more than once for the same event (retries), so
/// `handle` must tolerate re-delivery. The bus shares one instance across
/// invocations; any mutable state needs its own locking.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Name used in logs and dead-letter entries.
    fn name(&self) -> &str;

    /// The event types this handler wants to receive.
    fn event_types(&self) -> Vec<EventType>;

    /// Capability check performed by the dispatcher before each invocation.
    fn can_handle(&self, event_type: EventType) -> bool {
        self.event_types().contains(&event_type)
    }

    /// Processes one event.
    async fn handle(&self, event: &EventRecord) -> Result<(), DomainError>;
}
