//! The task aggregate.

use taskhub_core::aggregate::AggregateRoot;
use taskhub_core::clock::Clock;
use taskhub_core::error::DomainError;
use taskhub_core::event::EventRecord;
use taskhub_core::payload::{
    EventPayload, TaskAssigned, TaskCompleted, TaskCreated, TaskDeleted, TaskStatus,
    TaskStatusChanged,
};
use uuid::Uuid;

use super::raise;

/// A unit of work inside a project.
#[derive(Debug)]
pub struct Task {
    /// Aggregate identifier.
    pub id: Uuid,
    pub(crate) version: i64,
    pub(crate) project_id: Uuid,
    pub(crate) title: String,
    pub(crate) status: TaskStatus,
    pub(crate) assignee_id: Option<Uuid>,
    pub(crate) deleted: bool,
    uncommitted_events: Vec<EventRecord>,
}

impl Task {
    /// Creates a task, raising `TaskCreated`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if `title` is blank.
    pub fn create(
        id: Uuid,
        project_id: Uuid,
        title: &str,
        created_by: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DomainError::Validation("task title must not be blank".to_owned()));
        }
        let mut task = Self::empty(id);
        task.record(
            EventPayload::TaskCreated(TaskCreated {
                project_id,
                title: title.to_owned(),
                created_by,
            }),
            correlation_id,
            clock,
        );
        Ok(task)
    }

    /// Assigns the task, raising `TaskAssigned`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if the task is deleted or done.
    pub fn assign(
        &mut self,
        assignee_id: Uuid,
        assigned_by: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.record(
            EventPayload::TaskAssigned(TaskAssigned {
                project_id: self.project_id,
                assignee_id,
                assigned_by,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Moves the task to another workflow state, raising `TaskStatusChanged`.
    ///
    /// Moving to [`TaskStatus::Done`] goes through [`complete`](Self::complete).
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if the task is deleted or done, if
    /// `to` is the current status, or if `to` is `Done`.
    pub fn change_status(
        &mut self,
        to: TaskStatus,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;
        if to == TaskStatus::Done {
            return Err(DomainError::Validation(
                "use complete to finish a task".to_owned(),
            ));
        }
        if to == self.status {
            return Err(DomainError::Validation(format!(
                "task {} is already {to:?}",
                self.id
            )));
        }
        self.record(
            EventPayload::TaskStatusChanged(TaskStatusChanged {
                project_id: self.project_id,
                from: self.status,
                to,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Completes the task, raising `TaskCompleted`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if the task is deleted or done.
    pub fn complete(
        &mut self,
        completed_by: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_open()?;
        self.record(
            EventPayload::TaskCompleted(TaskCompleted {
                project_id: self.project_id,
                completed_by,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Deletes the task, raising `TaskDeleted`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if the task is already deleted.
    pub fn delete(
        &mut self,
        deleted_by: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if self.deleted {
            return Err(DomainError::Validation(format!(
                "task {} is deleted",
                self.id
            )));
        }
        self.record(
            EventPayload::TaskDeleted(TaskDeleted {
                project_id: self.project_id,
                deleted_by,
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Current workflow state.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Current assignee, if any.
    #[must_use]
    pub fn assignee_id(&self) -> Option<Uuid> {
        self.assignee_id
    }

    /// Task title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Owning project.
    #[must_use]
    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    /// Whether the task has been deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.deleted {
            return Err(DomainError::Validation(format!(
                "task {} is deleted",
                self.id
            )));
        }
        if self.status == TaskStatus::Done {
            return Err(DomainError::Validation(format!(
                "task {} is already done",
                self.id
            )));
        }
        Ok(())
    }

    fn record(&mut self, payload: EventPayload, correlation_id: Uuid, clock: &dyn Clock) {
        let event = raise(self.id, self.version + 1, payload, correlation_id, clock);
        self.apply(&event);
        self.uncommitted_events.push(event);
    }
}

impl AggregateRoot for Task {
    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &EventRecord) {
        match event.payload() {
            EventPayload::TaskCreated(payload) => {
                self.project_id = payload.project_id;
                self.title.clone_from(&payload.title);
                self.status = TaskStatus::Todo;
            }
            EventPayload::TaskAssigned(payload) => {
                self.assignee_id = Some(payload.assignee_id);
            }
            EventPayload::TaskStatusChanged(payload) => {
                self.status = payload.to;
            }
            EventPayload::TaskCompleted(_) => {
                self.status = TaskStatus::Done;
            }
            EventPayload::TaskDeleted(_) => {
                self.deleted = true;
            }
            _ => return,
        }
        self.version = event.version();
    }

    fn uncommitted_events(&self) -> &[EventRecord] {
        &self.uncommitted_events
    }

    fn take_uncommitted_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.uncommitted_events)
    }

    fn empty(id: Uuid) -> Self {
        Self {
            id,
            version: 0,
            project_id: Uuid::nil(),
            title: String::new(),
            status: TaskStatus::Todo,
            assignee_id: None,
            deleted: false,
            uncommitted_events: Vec::new(),
        }
    }
}
