//! Event builders with sensible defaults.

use chrono::{DateTime, TimeZone, Utc};
use taskhub_core::event::EventRecord;
use taskhub_core::payload::{
    EventPayload, EventType, ProjectArchived, ProjectCreated, ProjectMemberAdded, TaskAssigned,
    TaskCompleted, TaskCreated, TaskDeleted, TaskStatus, TaskStatusChanged, UserDeactivated,
    UserRegistered,
};
use uuid::Uuid;

/// Fixed timestamp used across tests.
///
/// # Panics
///
/// Never; the date is valid.
#[must_use]
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

/// Builds a payload of the requested type with placeholder data.
#[must_use]
pub fn payload_for(event_type: EventType) -> EventPayload {
    let project_id = Uuid::nil();
    let user_id = Uuid::nil();
    match event_type {
        EventType::TaskCreated => EventPayload::TaskCreated(TaskCreated {
            project_id,
            title: "Sample task".to_owned(),
            created_by: user_id,
        }),
        EventType::TaskAssigned => EventPayload::TaskAssigned(TaskAssigned {
            project_id,
            assignee_id: user_id,
            assigned_by: user_id,
        }),
        EventType::TaskStatusChanged => EventPayload::TaskStatusChanged(TaskStatusChanged {
            project_id,
            from: TaskStatus::Todo,
            to: TaskStatus::InProgress,
        }),
        EventType::TaskCompleted => EventPayload::TaskCompleted(TaskCompleted {
            project_id,
            completed_by: user_id,
        }),
        EventType::TaskDeleted => EventPayload::TaskDeleted(TaskDeleted {
            project_id,
            deleted_by: user_id,
        }),
        EventType::ProjectCreated => EventPayload::ProjectCreated(ProjectCreated {
            name: "Sample project".to_owned(),
            owner_id: user_id,
        }),
        EventType::ProjectMemberAdded => EventPayload::ProjectMemberAdded(ProjectMemberAdded {
            user_id,
            added_by: user_id,
        }),
        EventType::ProjectArchived => EventPayload::ProjectArchived(ProjectArchived {
            archived_by: user_id,
        }),
        EventType::UserRegistered => EventPayload::UserRegistered(UserRegistered {
            email: "sample@example.com".to_owned(),
            display_name: "Sample".to_owned(),
        }),
        EventType::UserDeactivated => EventPayload::UserDeactivated(UserDeactivated {
            reason: "sample".to_owned(),
        }),
    }
}

/// A version-1 event of the given type for a fresh aggregate.
#[must_use]
pub fn sample_event(event_type: EventType) -> EventRecord {
    sample_event_at(event_type, fixed_time())
}

/// Like [`sample_event`] with an explicit timestamp.
#[must_use]
pub fn sample_event_at(event_type: EventType, occurred_at: DateTime<Utc>) -> EventRecord {
    EventRecord::new(Uuid::new_v4(), 1, payload_for(event_type), occurred_at)
}

/// An event of the given type for a known aggregate and version.
#[must_use]
pub fn sample_event_for(aggregate_id: Uuid, version: i64, event_type: EventType) -> EventRecord {
    EventRecord::new(aggregate_id, version, payload_for(event_type), fixed_time())
}
