//! The user aggregate.

use taskhub_core::aggregate::AggregateRoot;
use taskhub_core::clock::Clock;
use taskhub_core::error::DomainError;
use taskhub_core::event::EventRecord;
use taskhub_core::payload::{EventPayload, UserDeactivated, UserRegistered};
use uuid::Uuid;

use super::raise;

/// A registered account.
#[derive(Debug)]
pub struct User {
    /// Aggregate identifier.
    pub id: Uuid,
    pub(crate) version: i64,
    pub(crate) email: String,
    pub(crate) display_name: String,
    pub(crate) active: bool,
    uncommitted_events: Vec<EventRecord>,
}

impl User {
    /// Registers a user, raising `UserRegistered`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if `email` has no `@` or
    /// `display_name` is blank.
    pub fn register(
        id: Uuid,
        email: &str,
        display_name: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        let email = email.trim();
        let Some((local, domain)) = email.split_once('@') else {
            return Err(DomainError::Validation(format!("invalid email: {email}")));
        };
        if local.is_empty() || domain.is_empty() {
            return Err(DomainError::Validation(format!("invalid email: {email}")));
        }
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(DomainError::Validation(
                "display name must not be blank".to_owned(),
            ));
        }

        let mut user = Self::empty(id);
        user.record(
            EventPayload::UserRegistered(UserRegistered {
                email: email.to_lowercase(),
                display_name: display_name.to_owned(),
            }),
            correlation_id,
            clock,
        );
        Ok(user)
    }

    /// Deactivates the account, raising `UserDeactivated`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Validation`] if the account is already inactive.
    pub fn deactivate(
        &mut self,
        reason: &str,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if !self.active {
            return Err(DomainError::Validation(format!(
                "user {} is already deactivated",
                self.id
            )));
        }
        self.record(
            EventPayload::UserDeactivated(UserDeactivated {
                reason: reason.to_owned(),
            }),
            correlation_id,
            clock,
        );
        Ok(())
    }

    /// Login email, lowercased.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Name shown to other users.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Whether the account can still be used.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn record(&mut self, payload: EventPayload, correlation_id: Uuid, clock: &dyn Clock) {
        let event = raise(self.id, self.version + 1, payload, correlation_id, clock);
        self.apply(&event);
        self.uncommitted_events.push(event);
    }
}

impl AggregateRoot for User {
    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &EventRecord) {
        match event.payload() {
            EventPayload::UserRegistered(payload) => {
                self.email.clone_from(&payload.email);
                self.display_name.clone_from(&payload.display_name);
                self.active = true;
            }
            EventPayload::UserDeactivated(_) => {
                self.active = false;
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
            email: String::new(),
            display_name: String::new(),
            active: false,
            uncommitted_events: Vec::new(),
        }
    }
}
