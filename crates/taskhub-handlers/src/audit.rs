//! Audit trail of every domain event.

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use taskhub_core::error::DomainError;
use taskhub_core::event::EventRecord;
use taskhub_core::handler::EventHandler;
use taskhub_core::payload::{AggregateType, EventPayload, EventType};

/// One line of the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    /// Audited event.
    pub event_id: Uuid,
    /// Its routing tag.
    pub event_type: EventType,
    /// Kind of aggregate that raised it.
    pub aggregate_type: AggregateType,
    /// Aggregate that raised it.
    pub aggregate_id: Uuid,
    /// Aggregate version the event produced.
    pub version: i64,
    /// Correlation id of the originating command.
    pub correlation_id: Uuid,
    /// When the event happened.
    pub occurred_at: DateTime<Utc>,
    /// Readable description.
    pub summary: String,
}

impl AuditEntry {
    fn from_event(event: &EventRecord) -> Self {
        Self {
            event_id: event.id(),
            event_type: event.event_type(),
            aggregate_type: event.aggregate_type(),
            aggregate_id: event.aggregate_id(),
            version: event.version(),
            correlation_id: event.metadata().correlation_id,
            occurred_at: event.occurred_at(),
            summary: summarize(event.payload()),
        }
    }
}

fn summarize(payload: &EventPayload) -> String {
    match payload {
        EventPayload::TaskCreated(p) => {
            format!(
                "task \"{}\" created by {} in project {}",
                p.title, p.created_by, p.project_id
            )
        }
        EventPayload::TaskAssigned(p) => {
            format!("task assigned to {} by {}", p.assignee_id, p.assigned_by)
        }
        EventPayload::TaskStatusChanged(p) => {
            format!("task moved from {:?} to {:?}", p.from, p.to)
        }
        EventPayload::TaskCompleted(p) => format!("task completed by {}", p.completed_by),
        EventPayload::TaskDeleted(p) => format!("task deleted by {}", p.deleted_by),
        EventPayload::ProjectCreated(p) => {
            format!("project \"{}\" created by {}", p.name, p.owner_id)
        }
        EventPayload::ProjectMemberAdded(p) => {
            format!("user {} added by {}", p.user_id, p.added_by)
        }
        EventPayload::ProjectArchived(p) => format!("project archived by {}", p.archived_by),
        EventPayload::UserRegistered(p) => {
            format!("user {} registered as \"{}\"", p.email, p.display_name)
        }
        EventPayload::UserDeactivated(p) => format!("user deactivated: {}", p.reason),
    }
}

#[derive(Debug, Default)]
struct Trail {
    entries: VecDeque<AuditEntry>,
    ids: HashSet<Uuid>,
}

/// Records every event it receives, keeping the most recent `capacity`.
#[derive(Debug)]
pub struct AuditTrailHandler {
    capacity: usize,
    trail: RwLock<Trail>,
}

impl AuditTrailHandler {
    /// Creates an empty trail retaining at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            trail: RwLock::new(Trail::default()),
        }
    }

    /// Retained entries, oldest first.
    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.trail.read().await.entries.iter().cloned().collect()
    }

    /// Retained entries of one aggregate, oldest first.
    pub async fn entries_for(&self, aggregate_id: Uuid) -> Vec<AuditEntry> {
        self.trail
            .read()
            .await
            .entries
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect()
    }

    /// Number of retained entries.
    pub async fn len(&self) -> usize {
        self.trail.read().await.entries.len()
    }

    /// Whether the trail is empty.
    pub async fn is_empty(&self) -> bool {
        self.trail.read().await.entries.is_empty()
    }
}

#[async_trait]
impl EventHandler for AuditTrailHandler {
    fn name(&self) -> &str {
        "audit"
    }

    fn event_types(&self) -> Vec<EventType> {
        EventType::ALL.to_vec()
    }

    async fn handle(&self, event: &EventRecord) -> Result<(), DomainError> {
        let mut trail = self.trail.write().await;
        if !trail.ids.insert(event.id()) {
            debug!(event_id = %event.id(), "event already audited");
            return Ok(());
        }
        let entry = AuditEntry::from_event(event);
        info!(
            event_id = %entry.event_id,
            event_type = %entry.event_type,
            aggregate_id = %entry.aggregate_id,
            summary = %entry.summary,
            "audit"
        );
        trail.entries.push_back(entry);
        while trail.entries.len() > self.capacity {
            if let Some(oldest) = trail.entries.pop_front() {
                trail.ids.remove(&oldest.event_id);
            }
        }
        Ok(())
    }
}
