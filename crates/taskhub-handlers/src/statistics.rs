//! Running counters over the event stream.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use taskhub_core::error::DomainError;
use taskhub_core::event::EventRecord;
use taskhub_core::handler::EventHandler;
use taskhub_core::payload::{EventPayload, EventType};

use crate::recent::RecentIds;

/// Snapshot of the counters kept by [`StatisticsHandler`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskhubStatistics {
    /// Distinct events counted.
    pub events_seen: u64,
    /// Distinct events per type tag.
    pub by_event_type: BTreeMap<String, u64>,
    /// `TaskCreated` events.
    pub tasks_created: u64,
    /// `TaskCompleted` events.
    pub tasks_completed: u64,
    /// `TaskDeleted` events.
    pub tasks_deleted: u64,
    /// Tasks created and neither completed nor deleted.
    pub open_tasks: usize,
    /// `ProjectCreated` events.
    pub projects_created: u64,
    /// `ProjectArchived` events.
    pub projects_archived: u64,
    /// `ProjectMemberAdded` events.
    pub project_members_added: u64,
    /// `UserRegistered` events.
    pub users_registered: u64,
    /// `UserDeactivated` events.
    pub users_deactivated: u64,
    /// Registered users not deactivated.
    pub active_users: usize,
}

#[derive(Debug)]
struct Counters {
    stats: TaskhubStatistics,
    seen: RecentIds,
    open_tasks: HashSet<Uuid>,
    active_users: HashSet<Uuid>,
}

impl Counters {
    fn count(&mut self, event: &EventRecord) {
        let stats = &mut self.stats;
        stats.events_seen += 1;
        *stats
            .by_event_type
            .entry(event.event_type().to_string())
            .or_default() += 1;

        let aggregate_id = event.aggregate_id();
        match event.payload() {
            EventPayload::TaskCreated(_) => {
                stats.tasks_created += 1;
                self.open_tasks.insert(aggregate_id);
            }
            EventPayload::TaskCompleted(_) => {
                stats.tasks_completed += 1;
                self.open_tasks.remove(&aggregate_id);
            }
            EventPayload::TaskDeleted(_) => {
                stats.tasks_deleted += 1;
                self.open_tasks.remove(&aggregate_id);
            }
            EventPayload::ProjectCreated(_) => stats.projects_created += 1,
            EventPayload::ProjectArchived(_) => stats.projects_archived += 1,
            EventPayload::ProjectMemberAdded(_) => stats.project_members_added += 1,
            EventPayload::UserRegistered(_) => {
                stats.users_registered += 1;
                self.active_users.insert(aggregate_id);
            }
            EventPayload::UserDeactivated(_) => {
                stats.users_deactivated += 1;
                self.active_users.remove(&aggregate_id);
            }
            EventPayload::TaskAssigned(_) | EventPayload::TaskStatusChanged(_) => {}
        }
        stats.open_tasks = self.open_tasks.len();
        stats.active_users = self.active_users.len();
    }
}

/// Counts every event once, however often it is delivered, as long as the
/// redelivery falls within the last `capacity` counted ids.
#[derive(Debug)]
pub struct StatisticsHandler {
    counters: RwLock<Counters>,
}

impl StatisticsHandler {
    /// Creates a handler with all counters at zero, remembering up to
    /// `capacity` counted event ids.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            counters: RwLock::new(Counters {
                stats: TaskhubStatistics::default(),
                seen: RecentIds::new(capacity),
                open_tasks: HashSet::new(),
                active_users: HashSet::new(),
            }),
        }
    }

    /// Current counters.
    pub async fn snapshot(&self) -> TaskhubStatistics {
        self.counters.read().await.stats.clone()
    }
}

#[async_trait]
impl EventHandler for StatisticsHandler {
    fn name(&self) -> &str {
        "statistics"
    }

    fn event_types(&self) -> Vec<EventType> {
        EventType::ALL.to_vec()
    }

    async fn handle(&self, event: &EventRecord) -> Result<(), DomainError> {
        let mut counters = self.counters.write().await;
        if !counters.seen.insert(event.id()) {
            debug!(event_id = %event.id(), "event already counted");
            return Ok(());
        }
        counters.count(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskhub_test_support::{sample_event, sample_event_for};

    #[tokio::test]
    async fn test_task_lifecycle_updates_open_tasks() {
        // Arrange
        let handler = StatisticsHandler::new(16);
        let done = Uuid::new_v4();
        let dropped = Uuid::new_v4();
        let pending = Uuid::new_v4();

        // Act
        for (task_id, version, event_type) in [
            (done, 1, EventType::TaskCreated),
            (dropped, 1, EventType::TaskCreated),
            (pending, 1, EventType::TaskCreated),
            (done, 2, EventType::TaskCompleted),
            (dropped, 2, EventType::TaskDeleted),
            (pending, 2, EventType::TaskAssigned),
        ] {
            handler
                .handle(&sample_event_for(task_id, version, event_type))
                .await
                .unwrap();
        }

        // Assert
        let stats = handler.snapshot().await;
        assert_eq!(stats.events_seen, 6);
        assert_eq!(stats.tasks_created, 3);
        assert_eq!(stats.tasks_completed, 1);
        assert_eq!(stats.tasks_deleted, 1);
        assert_eq!(stats.open_tasks, 1);
        assert_eq!(stats.by_event_type.get("TaskCreated"), Some(&3));
    }

    #[tokio::test]
    async fn test_active_users_follow_deactivation() {
        let handler = StatisticsHandler::new(16);
        let user = Uuid::new_v4();

        handler
            .handle(&sample_event_for(user, 1, EventType::UserRegistered))
            .await
            .unwrap();
        handler
            .handle(&sample_event(EventType::UserRegistered))
            .await
            .unwrap();
        handler
            .handle(&sample_event_for(user, 2, EventType::UserDeactivated))
            .await
            .unwrap();

        let stats = handler.snapshot().await;
        assert_eq!(stats.users_registered, 2);
        assert_eq!(stats.users_deactivated, 1);
        assert_eq!(stats.active_users, 1);
    }

    #[tokio::test]
    async fn test_redelivered_event_is_counted_once() {
        let handler = StatisticsHandler::new(16);
        let event = sample_event(EventType::ProjectCreated);

        handler.handle(&event).await.unwrap();
        handler.handle(&event).await.unwrap();

        let stats = handler.snapshot().await;
        assert_eq!(stats.events_seen, 1);
        assert_eq!(stats.projects_created, 1);
    }

    #[tokio::test]
    async fn test_seen_ids_stay_within_capacity() {
        // Arrange
        let handler = StatisticsHandler::new(8);
        let events: Vec<EventRecord> = (0..100)
            .map(|_| sample_event(EventType::UserRegistered))
            .collect();

        // Act
        for event in &events {
            handler.handle(event).await.unwrap();
        }
        handler.handle(&events[99]).await.unwrap();

        // Assert
        assert_eq!(handler.counters.read().await.seen.len(), 8);
        let stats = handler.snapshot().await;
        assert_eq!(stats.events_seen, 100);
        assert_eq!(stats.users_registered, 100);
    }
}
