//! Event store abstraction.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::EventError;
use crate::event::EventRecord;
use crate::payload::EventType;

/// Read-only diagnostics snapshot of an event store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of retained records.
    pub total: usize,
    /// Maximum number of retained records.
    pub capacity: usize,
    /// Retained records per event type tag.
    pub by_event_type: BTreeMap<String, usize>,
    /// Retained records per aggregate type.
    pub by_aggregate_type: BTreeMap<String, usize>,
    /// Timestamp of the oldest retained record.
    pub oldest: Option<DateTime<Utc>>,
    /// Timestamp of the newest retained record.
    pub newest: Option<DateTime<Utc>>,
}

/// Bounded log of dispatched events.
///
/// Implementations keep records in append order, reject duplicate ids and
/// evict the oldest records once over capacity.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends one event.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DuplicateId`] if the id is already stored.
    async fn save(&self, event: EventRecord) -> Result<(), EventError>;

    /// Appends several events, or none of them.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DuplicateId`] for the first colliding id, either
    /// with the store or within the batch itself, before anything is written.
    async fn save_batch(&self, events: Vec<EventRecord>) -> Result<(), EventError>;

    /// Looks up one event by id.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::NotFound`] if the id is unknown or was evicted.
    async fn get(&self, event_id: Uuid) -> Result<EventRecord, EventError>;

    /// Events of one aggregate with `version >= from_version`, ascending by
    /// version.
    async fn get_events(&self, aggregate_id: Uuid, from_version: i64) -> Vec<EventRecord>;

    /// The `limit` most recent events of one type, in chronological order.
    async fn get_events_by_type(&self, event_type: EventType, limit: usize) -> Vec<EventRecord>;

    /// The `limit` most recent events with `start <= occurred_at <= end`, in
    /// chronological order.
    async fn get_events_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Vec<EventRecord>;

    /// Number of retained events.
    async fn count(&self) -> usize;

    /// Diagnostics snapshot.
    async fn stats(&self) -> StoreStats;

    /// Removes every record and index entry.
    async fn clear(&self);
}
