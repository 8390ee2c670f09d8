//! The project aggregate.

use taskhub_core::aggregate::AggregateRoot;
use taskhub_core::clock::Clock;
use taskhub_core::error::DomainError;
use taskhub_core::event::EventRecord;
use taskhub_core::payload::{EventPayload, ProjectArchived, ProjectCreated, ProjectMemberAdded};
use uuid::Uuid;

use super::raise;

/// A collection of tasks shared by its members.
#[derive(Debug)]
pub struct Project {
    /// Aggregate identifier.
    pub id: Uuid,
    pub(crate) version: i64,
    pub(crate) name: String,
    pub(crate) owner_id: Uuid,
    pub(crate) member_ids: Vec<Uuid>,
    pub(crate) archived: bool,
    uncommitted_events: Vec<EventRecord>,
}

impl Project {
    /// Creates a project owned by `owner_id`, raising `ProjectCreated`.
    ///
    /// The owner counts as a member.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if `name` is blank.
    pub fn create(
        id: Uuid,
        name: &str,
        owner_id: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation(
                "project name must not be blank".to_owned(),
            ));
        }
        let mut project = Self::empty(id);
        project.record(
            EventPayload::ProjectCreated(ProjectCreated {
                name: name.to_owned(),
                owner_id,
            }),
            correlation_id,
            clock,
        );
        Ok(project)
    }

    /// Adds a member, raising `ProjectMemberAdded`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if the project is archived or the
    /// user is already a member.
    pub fn add_member(
        &mut self,
        user_id: Uuid,
        added_by: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        if self.is_member(user_id) {
            return Err(DomainError::Validation(format!(
                "user {user_id} is already a member of project {}",
                self.id
            )));
        }
        self.record(
            EventPayload::ProjectMemberAdded(ProjectMemberAdded { user_id, added_by }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Archives the project, raising `ProjectArchived`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if the project is already archived.
    pub fn archive(
        &mut self,
        archived_by: Uuid,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.ensure_active()?;
        self.record(
            EventPayload::ProjectArchived(ProjectArchived { archived_by }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Project name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning user.
    #[must_use]
    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    /// Members in joining order, owner first.
    #[must_use]
    pub fn member_ids(&self) -> &[Uuid] {
        &self.member_ids
    }

    /// Whether `user_id` belongs to the project.
    #[must_use]
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.member_ids.contains(&user_id)
    }

    /// Whether the project has been archived.
    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.archived
    }

    fn ensure_active(&self) -> Result<(), DomainError> {
        if self.archived {
            return Err(DomainError::Validation(format!(
                "project {} is archived",
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

impl AggregateRoot for Project {
    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &EventRecord) {
        match event.payload() {
            EventPayload::ProjectCreated(payload) => {
                self.name.clone_from(&payload.name);
                self.owner_id = payload.owner_id;
                self.member_ids = vec![payload.owner_id];
            }
            EventPayload::ProjectMemberAdded(payload) => {
                self.member_ids.push(payload.user_id);
            }
            EventPayload::ProjectArchived(_) => {
                self.archived = true;
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
            name: String::new(),
            owner_id: Uuid::nil(),
            member_ids: Vec::new(),
            archived: false,
            uncommitted_events: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskhub_core::payload::EventType;
    use taskhub_test_support::{FixedClock, fixed_time};

    #[test]
    fn test_create_makes_owner_a_member() {
        // Arrange
        let owner = Uuid::new_v4();
        let clock = FixedClock(fixed_time());

        // Act
        let project =
            Project::create(Uuid::new_v4(), "Website relaunch", owner, Uuid::new_v4(), &clock)
                .unwrap();

        // Assert
        assert_eq!(project.name(), "Website relaunch");
        assert_eq!(project.owner_id(), owner);
        assert_eq!(project.member_ids(), &[owner]);
        assert_eq!(
            project.uncommitted_events()[0].event_type(),
            EventType::ProjectCreated
        );
    }

    #[test]
    fn test_add_member_twice_is_rejected() {
        // Arrange
        let owner = Uuid::new_v4();
        let member = Uuid::new_v4();
        let clock = FixedClock(fixed_time());
        let mut project =
            Project::create(Uuid::new_v4(), "Website relaunch", owner, Uuid::new_v4(), &clock)
                .unwrap();
        project
            .add_member(member, owner, Uuid::new_v4(), &clock)
            .unwrap();

        // Act
        let again = project.add_member(member, owner, Uuid::new_v4(), &clock);
        let owner_again = project.add_member(owner, owner, Uuid::new_v4(), &clock);

        // Assert
        assert!(matches!(again, Err(DomainError::Validation(_))));
        assert!(matches!(owner_again, Err(DomainError::Validation(_))));
        assert_eq!(project.member_ids(), &[owner, member]);
        assert_eq!(project.version(), 2);
    }

    #[test]
    fn test_archived_project_rejects_new_members() {
        let owner = Uuid::new_v4();
        let clock = FixedClock(fixed_time());
        let mut project =
            Project::create(Uuid::new_v4(), "Legacy", owner, Uuid::new_v4(), &clock).unwrap();
        project.archive(owner, Uuid::new_v4(), &clock).unwrap();

        let result = project.add_member(Uuid::new_v4(), owner, Uuid::new_v4(), &clock);

        assert!(project.is_archived());
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(project.archive(owner, Uuid::new_v4(), &clock).is_err());
    }

    #[test]
    fn test_replay_rejects_gap_in_history() {
        // Arrange
        let owner = Uuid::new_v4();
        let clock = FixedClock(fixed_time());
        let mut project =
            Project::create(Uuid::new_v4(), "Legacy", owner, Uuid::new_v4(), &clock).unwrap();
        project
            .add_member(Uuid::new_v4(), owner, Uuid::new_v4(), &clock)
            .unwrap();
        project.archive(owner, Uuid::new_v4(), &clock).unwrap();
        let mut history = project.take_uncommitted_events();
        history.remove(1);

        // Act
        let result = Project::replay(project.id, &history);

        // Assert
        assert!(matches!(
            result,
            Err(DomainError::VersionConflict {
                expected: 2,
                actual: 3,
                ..
            })
        ));
    }
}
