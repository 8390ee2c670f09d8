//! User notifications derived from domain events.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use taskhub_core::error::{DomainError, EventError};
use taskhub_core::event::EventRecord;
use taskhub_core::handler::EventHandler;
use taskhub_core::payload::{EventType, ProjectMemberAdded, TaskAssigned, UserRegistered};

use crate::recent::RecentIds;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    /// The recipient was assigned a task.
    TaskAssigned,
    /// The recipient joined a project.
    AddedToProject,
    /// The recipient just registered.
    Welcome,
}

/// A message for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Event that triggered the notification.
    pub event_id: Uuid,
    /// User the notification is for.
    pub recipient_id: Uuid,
    /// Notification category.
    pub kind: NotificationKind,
    /// Human-readable text.
    pub message: String,
}

/// Delivery channel for notifications (mail gateway, push service, ...).
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Delivers one notification.
    async fn send(&self, notification: &Notification) -> Result<(), DomainError>;
}

/// Sink that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct InMemorySink {
    sent: Mutex<Vec<Notification>>,
}

impl InMemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, oldest first.
    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSink for InMemorySink {
    async fn send(&self, notification: &Notification) -> Result<(), DomainError> {
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}

/// Turns assignment, membership and registration events into notifications.
///
/// An event is only marked delivered after the sink accepted it, so a sink
/// failure is retried by the bus and a redelivered event is sent once. Only
/// the last `capacity` delivered ids are remembered.
pub struct NotificationHandler {
    sink: Arc<dyn NotificationSink>,
    delivered: Mutex<RecentIds>,
}

impl NotificationHandler {
    /// Creates a handler delivering to `sink`, remembering up to `capacity`
    /// delivered event ids.
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>, capacity: usize) -> Self {
        Self {
            sink,
            delivered: Mutex::new(RecentIds::new(capacity)),
        }
    }

    fn compose(event: &EventRecord) -> Result<Option<Notification>, EventError> {
        let notification = match event.event_type() {
            EventType::TaskAssigned => {
                let assigned = event.narrow::<TaskAssigned>()?;
                Notification {
                    event_id: event.id(),
                    recipient_id: assigned.assignee_id,
                    kind: NotificationKind::TaskAssigned,
                    message: format!("You have been assigned task {}", event.aggregate_id()),
                }
            }
            EventType::ProjectMemberAdded => {
                let added = event.narrow::<ProjectMemberAdded>()?;
                Notification {
                    event_id: event.id(),
                    recipient_id: added.user_id,
                    kind: NotificationKind::AddedToProject,
                    message: format!("You have been added to project {}", event.aggregate_id()),
                }
            }
            EventType::UserRegistered => {
                let registered = event.narrow::<UserRegistered>()?;
                Notification {
                    event_id: event.id(),
                    recipient_id: event.aggregate_id(),
                    kind: NotificationKind::Welcome,
                    message: format!("Welcome to Taskhub, {}!", registered.display_name),
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(notification))
    }
}

#[async_trait]
impl EventHandler for NotificationHandler {
    fn name(&self) -> &str {
        "notification"
    }

    fn event_types(&self) -> Vec<EventType> {
        vec![
            EventType::TaskAssigned,
            EventType::ProjectMemberAdded,
            EventType::UserRegistered,
        ]
    }

    async fn handle(&self, event: &EventRecord) -> Result<(), DomainError> {
        let Some(notification) =
            Self::compose(event).map_err(|e| DomainError::Validation(e.to_string()))?
        else {
            return Ok(());
        };

        let mut delivered = self.delivered.lock().await;
        if delivered.contains(&event.id()) {
            debug!(event_id = %event.id(), "notification already delivered");
            return Ok(());
        }
        self.sink.send(&notification).await?;
        delivered.insert(event.id());
        info!(
            event_id = %event.id(),
            recipient_id = %notification.recipient_id,
            kind = ?notification.kind,
            "notification sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use taskhub_core::payload::EventPayload;
    use taskhub_test_support::{fixed_time, sample_event};

    /// Sink that rejects its first call.
    #[derive(Default)]
    struct FlakySink {
        calls: AtomicUsize,
        inner: InMemorySink,
    }

    #[async_trait]
    impl NotificationSink for FlakySink {
        async fn send(&self, notification: &Notification) -> Result<(), DomainError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(DomainError::Infrastructure("smtp unavailable".to_owned()));
            }
            self.inner.send(notification).await
        }
    }

    fn assignment(assignee_id: Uuid) -> EventRecord {
        EventRecord::new(
            Uuid::new_v4(),
            2,
            EventPayload::TaskAssigned(TaskAssigned {
                project_id: Uuid::new_v4(),
                assignee_id,
                assigned_by: Uuid::new_v4(),
            }),
            fixed_time(),
        )
    }

    #[tokio::test]
    async fn test_assignment_notifies_assignee() {
        // Arrange
        let sink = Arc::new(InMemorySink::new());
        let handler = NotificationHandler::new(sink.clone(), 16);
        let assignee = Uuid::new_v4();
        let event = assignment(assignee);

        // Act
        handler.handle(&event).await.unwrap();

        // Assert
        let sent = sink.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient_id, assignee);
        assert_eq!(sent[0].kind, NotificationKind::TaskAssigned);
        assert_eq!(sent[0].event_id, event.id());
    }

    #[tokio::test]
    async fn test_redelivered_event_is_sent_once() {
        let sink = Arc::new(InMemorySink::new());
        let handler = NotificationHandler::new(sink.clone(), 16);
        let event = assignment(Uuid::new_v4());

        handler.handle(&event).await.unwrap();
        handler.handle(&event).await.unwrap();

        assert_eq!(sink.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_sink_failure_is_reported_and_retry_delivers() {
        // Arrange
        let sink = Arc::new(FlakySink::default());
        let handler = NotificationHandler::new(sink.clone(), 16);
        let event = sample_event(EventType::UserRegistered);

        // Act
        let first = handler.handle(&event).await;
        let second = handler.handle(&event).await;

        // Assert
        assert!(matches!(first, Err(DomainError::Infrastructure(_))));
        assert!(second.is_ok());
        let sent = sink.inner.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::Welcome);
        assert_eq!(sent[0].message, "Welcome to Taskhub, Sample!");
    }

    #[tokio::test]
    async fn test_unrelated_event_sends_nothing() {
        let sink = Arc::new(InMemorySink::new());
        let handler = NotificationHandler::new(sink.clone(), 16);

        handler
            .handle(&sample_event(EventType::TaskDeleted))
            .await
            .unwrap();

        assert!(sink.sent().await.is_empty());
        assert!(!handler.can_handle(EventType::TaskDeleted));
    }

    #[tokio::test]
    async fn test_delivered_ids_stay_within_capacity() {
        // Arrange
        let sink = Arc::new(InMemorySink::new());
        let handler = NotificationHandler::new(sink.clone(), 4);
        let events: Vec<EventRecord> = (0..50).map(|_| assignment(Uuid::new_v4())).collect();

        // Act
        for event in &events {
            handler.handle(event).await.unwrap();
        }
        handler.handle(&events[49]).await.unwrap();

        // Assert
        assert_eq!(handler.delivered.lock().await.len(), 4);
        assert_eq!(sink.sent().await.len(), 50);
    }
}
