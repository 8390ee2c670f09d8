//! Payload narrowing: recover a concrete payload type from an event record.
//!
//! Handlers that care about several event types should `match` on
//! [`EventRecord::payload`] directly; that match is total. [`EventRecord::narrow`]
//! serves handlers written against a single payload type.

use crate::error::EventError;
use crate::event::EventRecord;
use crate::payload::{
    EventPayload, EventType, ProjectArchived, ProjectCreated, ProjectMemberAdded, TaskAssigned,
    TaskCompleted, TaskCreated, TaskDeleted, TaskStatusChanged, UserDeactivated, UserRegistered,
};

/// A payload struct bound to exactly one [`EventType`].
pub trait TypedPayload: Sized {
    /// The tag carried by records holding this payload.
    const EVENT_TYPE: EventType;

    /// Borrows `Self` out of the payload enum, if the variant matches.
    fn from_payload(payload: &EventPayload) -> Option<&Self>;
}

macro_rules! typed_payload {
    ($($name:ident),+ $(,)?) => {
        $(
            impl TypedPayload for $name {
                const EVENT_TYPE: EventType = EventType::$name;

                fn from_payload(payload: &EventPayload) -> Option<&Self> {
                    match payload {
                        EventPayload::$name(inner) => Some(inner),
                        _ => None,
                    }
                }
            }
        )+
    };
}

typed_payload!(
    TaskCreated,
    TaskAssigned,
    TaskStatusChanged,
    TaskCompleted,
    TaskDeleted,
    ProjectCreated,
    ProjectMemberAdded,
    ProjectArchived,
    UserRegistered,
    UserDeactivated,
);

impl EventRecord {
    /// Narrows the payload to `T`.
    ///
    /// The record's routing tag is checked first; the payload accessor is
    /// only consulted when the tag matches. Since the tag is derived from the
    /// payload variant both checks agree, and the only failure is asking for
    /// the wrong type.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::TypeMismatch`] naming the expected and actual tags.
    pub fn narrow<T: TypedPayload>(&self) -> Result<&T, EventError> {
        let actual = self.event_type();
        let mismatch = || EventError::TypeMismatch {
            expected: T::EVENT_TYPE,
            actual,
        };
        if actual != T::EVENT_TYPE {
            return Err(mismatch());
        }
        T::from_payload(self.payload()).ok_or_else(mismatch)
    }
}
