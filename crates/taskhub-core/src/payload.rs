//! Event payloads: the closed set of things that can happen in Taskhub.
//!
//! Every payload variant is keyed by the same [`EventType`] tag that the bus
//! routes on, so the tag of an event can never disagree with its payload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The kind of business entity that raised an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AggregateType {
    /// A unit of work inside a project.
    Task,
    /// A collection of tasks with a member list.
    Project,
    /// A registered account.
    User,
}

impl AggregateType {
    /// Returns the stable string name of the aggregate type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "Task",
            Self::Project => "Project",
            Self::User => "User",
        }
    }
}

impl fmt::Display for AggregateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing tag identifying the semantic kind of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    /// A task was created in a project.
    TaskCreated,
    /// A task was assigned to a user.
    TaskAssigned,
    /// A task moved between workflow states.
    TaskStatusChanged,
    /// A task was completed.
    TaskCompleted,
    /// A task was deleted.
    TaskDeleted,
    /// A project was created.
    ProjectCreated,
    /// A user joined a project.
    ProjectMemberAdded,
    /// A project was archived.
    ProjectArchived,
    /// A user registered.
    UserRegistered,
    /// A user account was deactivated.
    UserDeactivated,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::TaskCreated,
        Self::TaskAssigned,
        Self::TaskStatusChanged,
        Self::TaskCompleted,
        Self::TaskDeleted,
        Self::ProjectCreated,
        Self::ProjectMemberAdded,
        Self::ProjectArchived,
        Self::UserRegistered,
        Self::UserDeactivated,
    ];

    /// Returns the tag string used in logs and diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskCreated => "TaskCreated",
            Self::TaskAssigned => "TaskAssigned",
            Self::TaskStatusChanged => "TaskStatusChanged",
            Self::TaskCompleted => "TaskCompleted",
            Self::TaskDeleted => "TaskDeleted",
            Self::ProjectCreated => "ProjectCreated",
            Self::ProjectMemberAdded => "ProjectMemberAdded",
            Self::ProjectArchived => "ProjectArchived",
            Self::UserRegistered => "UserRegistered",
            Self::UserDeactivated => "UserDeactivated",
        }
    }

    /// Returns the aggregate type that raises events of this kind.
    #[must_use]
    pub const fn aggregate_type(self) -> AggregateType {
        match self {
            Self::TaskCreated
            | Self::TaskAssigned
            | Self::TaskStatusChanged
            | Self::TaskCompleted
            | Self::TaskDeleted => AggregateType::Task,
            Self::ProjectCreated | Self::ProjectMemberAdded | Self::ProjectArchived => {
                AggregateType::Project
            }
            Self::UserRegistered | Self::UserDeactivated => AggregateType::User,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known event type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_owned()))
    }
}

/// Workflow state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not started.
    Todo,
    /// Being worked on.
    InProgress,
    /// Waiting for review.
    Review,
    /// Finished.
    Done,
}

/// Payload of [`EventType::TaskCreated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCreated {
    /// Project the task belongs to.
    pub project_id: Uuid,
    /// Task title.
    pub title: String,
    /// User who created the task.
    pub created_by: Uuid,
}

/// Payload of [`EventType::TaskAssigned`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssigned {
    /// Project the task belongs to.
    pub project_id: Uuid,
    /// User now responsible for the task.
    pub assignee_id: Uuid,
    /// User who made the assignment.
    pub assigned_by: Uuid,
}

/// Payload of [`EventType::TaskStatusChanged`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusChanged {
    /// Project the task belongs to.
    pub project_id: Uuid,
    /// Previous status.
    pub from: TaskStatus,
    /// New status.
    pub to: TaskStatus,
}

/// Payload of [`EventType::TaskCompleted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCompleted {
    /// Project the task belongs to.
    pub project_id: Uuid,
    /// User who completed the task.
    pub completed_by: Uuid,
}

/// Payload of [`EventType::TaskDeleted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDeleted {
    /// Project the task belonged to.
    pub project_id: Uuid,
    /// User who deleted the task.
    pub deleted_by: Uuid,
}

/// Payload of [`EventType::ProjectCreated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCreated {
    /// Project name.
    pub name: String,
    /// Owning user.
    pub owner_id: Uuid,
}

/// Payload of [`EventType::ProjectMemberAdded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMemberAdded {
    /// The new member.
    pub user_id: Uuid,
    /// User who added the member.
    pub added_by: Uuid,
}

/// Payload of [`EventType::ProjectArchived`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectArchived {
    /// User who archived the project.
    pub archived_by: Uuid,
}

/// Payload of [`EventType::UserRegistered`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    /// Login email.
    pub email: String,
    /// Name shown to other users.
    pub display_name: String,
}

/// Payload of [`EventType::UserDeactivated`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeactivated {
    /// Free-form reason recorded by the operator.
    pub reason: String,
}

/// Event payload variants, one per [`EventType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    /// See [`TaskCreated`].
    TaskCreated(TaskCreated),
    /// See [`TaskAssigned`].
    TaskAssigned(TaskAssigned),
    /// See [`TaskStatusChanged`].
    TaskStatusChanged(TaskStatusChanged),
    /// See [`TaskCompleted`].
    TaskCompleted(TaskCompleted),
    /// See [`TaskDeleted`].
    TaskDeleted(TaskDeleted),
    /// See [`ProjectCreated`].
    ProjectCreated(ProjectCreated),
    /// See [`ProjectMemberAdded`].
    ProjectMemberAdded(ProjectMemberAdded),
    /// See [`ProjectArchived`].
    ProjectArchived(ProjectArchived),
    /// See [`UserRegistered`].
    UserRegistered(UserRegistered),
    /// See [`UserDeactivated`].
    UserDeactivated(UserDeactivated),
}

impl EventPayload {
    /// Returns the routing tag of this payload.
    #[must_use]
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::TaskCreated(_) => EventType::TaskCreated,
            Self::TaskAssigned(_) => EventType::TaskAssigned,
            Self::TaskStatusChanged(_) => EventType::TaskStatusChanged,
            Self::TaskCompleted(_) => EventType::TaskCompleted,
            Self::TaskDeleted(_) => EventType::TaskDeleted,
            Self::ProjectCreated(_) => EventType::ProjectCreated,
            Self::ProjectMemberAdded(_) => EventType::ProjectMemberAdded,
            Self::ProjectArchived(_) => EventType::ProjectArchived,
            Self::UserRegistered(_) => EventType::UserRegistered,
            Self::UserDeactivated(_) => EventType::UserDeactivated,
        }
    }
}
