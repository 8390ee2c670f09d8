//! In-memory implementation of the `EventStore` trait.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use taskhub_core::error::EventError;
use taskhub_core::event::EventRecord;
use taskhub_core::payload::EventType;
use taskhub_core::store::{EventStore, StoreStats};

/// Capacity used when none is configured.
pub const DEFAULT_STORE_CAPACITY: usize = 10_000;

/// Append-ordered records plus an id index.
///
/// Every appended record gets a sequence number. The index maps an id to
/// that number, and `front_seq` is the sequence number of `records[0]`, so a
/// lookup is `records[index[id] - front_seq]`.
#[derive(Debug, Default)]
struct Log {
    records: VecDeque<EventRecord>,
    index: HashMap<Uuid, u64>,
    front_seq: u64,
    next_seq: u64,
}

impl Log {
    fn push(&mut self, event: EventRecord) {
        self.index.insert(event.id(), self.next_seq);
        self.next_seq += 1;
        self.records.push_back(event);
    }

    fn evict_to(&mut self, capacity: usize) -> usize {
        let mut evicted = 0;
        while self.records.len() > capacity {
            let Some(oldest) = self.records.pop_front() else {
                break;
            };
            self.index.remove(&oldest.id());
            self.front_seq += 1;
            evicted += 1;
        }
        evicted
    }

    fn get(&self, event_id: Uuid) -> Option<&EventRecord> {
        let seq = *self.index.get(&event_id)?;
        let position = usize::try_from(seq - self.front_seq).ok()?;
        self.records.get(position)
    }

    fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
        self.front_seq = self.next_seq;
    }
}

/// Bounded event store guarded by a read/write lock.
///
/// Many readers may query concurrently; writes are exclusive. When a write
/// pushes the store past its capacity the oldest records are evicted.
#[derive(Debug)]
pub struct InMemoryEventStore {
    capacity: usize,
    log: RwLock<Log>,
}

impl InMemoryEventStore {
    /// Creates an empty store retaining at most `capacity` records.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            log: RwLock::new(Log::default()),
        }
    }

    /// Maximum number of retained records.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Every retained record in append order.
    pub async fn snapshot(&self) -> Vec<EventRecord> {
        self.log.read().await.records.iter().cloned().collect()
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_CAPACITY)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn save(&self, event: EventRecord) -> Result<(), EventError> {
        let mut log = self.log.write().await;
        if log.index.contains_key(&event.id()) {
            return Err(EventError::DuplicateId(event.id()));
        }
        log.push(event);
        let evicted = log.evict_to(self.capacity);
        if evicted > 0 {
            debug!(evicted, capacity = self.capacity, "evicted oldest events");
        }
        Ok(())
    }

    async fn save_batch(&self, events: Vec<EventRecord>) -> Result<(), EventError> {
        let mut log = self.log.write().await;
        let mut batch_ids = HashSet::with_capacity(events.len());
        for event in &events {
            let id = event.id();
            if log.index.contains_key(&id) || !batch_ids.insert(id) {
                return Err(EventError::DuplicateId(id));
            }
        }
        for event in events {
            log.push(event);
        }
        let evicted = log.evict_to(self.capacity);
        if evicted > 0 {
            debug!(evicted, capacity = self.capacity, "evicted oldest events");
        }
        Ok(())
    }

    async fn get(&self, event_id: Uuid) -> Result<EventRecord, EventError> {
        self.log
            .read()
            .await
            .get(event_id)
            .cloned()
            .ok_or(EventError::NotFound(event_id))
    }

    async fn get_events(&self, aggregate_id: Uuid, from_version: i64) -> Vec<EventRecord> {
        let log = self.log.read().await;
        let mut events: Vec<EventRecord> = log
            .records
            .iter()
            .filter(|e| e.aggregate_id() == aggregate_id && e.version() >= from_version)
            .cloned()
            .collect();
        events.sort_by_key(EventRecord::version);
        events
    }

    async fn get_events_by_type(&self, event_type: EventType, limit: usize) -> Vec<EventRecord> {
        let log = self.log.read().await;
        let mut events: Vec<EventRecord> = log
            .records
            .iter()
            .rev()
            .filter(|e| e.event_type() == event_type)
            .take(limit)
            .cloned()
            .collect();
        events.reverse();
        events
    }

    async fn get_events_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Vec<EventRecord> {
        let log = self.log.read().await;
        let mut events: Vec<EventRecord> = log
            .records
            .iter()
            .rev()
            .filter(|e| (start..=end).contains(&e.occurred_at()))
            .take(limit)
            .cloned()
            .collect();
        events.reverse();
        events
    }

    async fn count(&self) -> usize {
        self.log.read().await.records.len()
    }

    async fn stats(&self) -> StoreStats {
        let log = self.log.read().await;
        let mut stats = StoreStats {
            total: log.records.len(),
            capacity: self.capacity,
            ..StoreStats::default()
        };
        for event in &log.records {
            *stats
                .by_event_type
                .entry(event.event_type().to_string())
                .or_default() += 1;
            *stats
                .by_aggregate_type
                .entry(event.aggregate_type().to_string())
                .or_default() += 1;
            let at = event.occurred_at();
            stats.oldest = Some(stats.oldest.map_or(at, |t| t.min(at)));
            stats.newest = Some(stats.newest.map_or(at, |t| t.max(at)));
        }
        stats
    }

    async fn clear(&self) {
        self.log.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskhub_test_support::sample_event;

    #[tokio::test]
    async fn test_index_follows_eviction() {
        // Arrange
        let store = InMemoryEventStore::new(2);
        let first = sample_event(EventType::TaskCreated);
        let second = sample_event(EventType::TaskAssigned);
        let third = sample_event(EventType::TaskCompleted);

        // Act
        store.save(first.clone()).await.unwrap();
        store.save(second.clone()).await.unwrap();
        store.save(third.clone()).await.unwrap();

        // Assert
        assert_eq!(store.get(first.id()).await, Err(EventError::NotFound(first.id())));
        assert_eq!(store.get(second.id()).await.unwrap(), second);
        assert_eq!(store.get(third.id()).await.unwrap(), third);
    }

    #[tokio::test]
    async fn test_evicted_id_can_be_saved_again() {
        let store = InMemoryEventStore::new(1);
        let first = sample_event(EventType::TaskCreated);

        store.save(first.clone()).await.unwrap();
        store.save(sample_event(EventType::TaskCreated)).await.unwrap();

        assert!(store.save(first).await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_capacity_is_raised_to_one() {
        let store = InMemoryEventStore::new(0);

        store.save(sample_event(EventType::UserRegistered)).await.unwrap();

        assert_eq!(store.capacity(), 1);
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn test_lookup_after_clear_uses_fresh_positions() {
        let store = InMemoryEventStore::new(4);
        store.save(sample_event(EventType::TaskCreated)).await.unwrap();
        store.save(sample_event(EventType::TaskCreated)).await.unwrap();

        store.clear().await;
        let event = sample_event(EventType::ProjectCreated);
        store.save(event.clone()).await.unwrap();

        assert_eq!(store.get(event.id()).await.unwrap(), event);
        assert_eq!(store.count().await, 1);
    }
}
