//! Shared application state.

use std::sync::Arc;

use taskhub_core::clock::Clock;
use taskhub_event_bus::{EventBus, EventBusConfig};
use taskhub_handlers::{AuditTrailHandler, InMemorySink, NotificationHandler, StatisticsHandler};

use crate::error::AppError;

/// Entries kept by the audit trail.
pub const AUDIT_TRAIL_CAPACITY: usize = 1_000;

/// Recent event ids the notification and statistics handlers remember for
/// deduplication.
pub const DEDUP_WINDOW: usize = 10_000;

/// The bus plus the handlers subscribed to it.
#[derive(Clone)]
pub struct AppState {
    /// Event bus, stopped until [`EventBus::start`] is called.
    pub bus: Arc<EventBus>,
    /// Clock used for raised events.
    pub clock: Arc<dyn Clock>,
    /// Where notifications end up.
    pub notifications: Arc<InMemorySink>,
    /// Audit trail handler.
    pub audit: Arc<AuditTrailHandler>,
    /// Statistics handler.
    pub statistics: Arc<StatisticsHandler>,
}

impl AppState {
    /// Builds a bus from `config` and subscribes every handler to the event
    /// types it declares.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if `config` is invalid.
    pub async fn new(config: EventBusConfig, clock: Arc<dyn Clock>) -> Result<Self, AppError> {
        config.validate()?;
        let bus = Arc::new(EventBus::new(config));
        let notifications = Arc::new(InMemorySink::new());
        let audit = Arc::new(AuditTrailHandler::new(AUDIT_TRAIL_CAPACITY));
        let statistics = Arc::new(StatisticsHandler::new(DEDUP_WINDOW));

        bus.subscribe_all(Arc::new(NotificationHandler::new(
            notifications.clone(),
            DEDUP_WINDOW,
        )))
        .await?;
        bus.subscribe_all(audit.clone()).await?;
        bus.subscribe_all(statistics.clone()).await?;

        Ok(Self {
            bus,
            clock,
            notifications,
            audit,
            statistics,
        })
    }
}
