//! Taskhub handlers: the downstream consumers of domain events.
//!
//! - [`NotificationHandler`] tells users about assignments, project
//!   memberships and their own registration.
//! - [`AuditTrailHandler`] keeps a bounded, queryable trail of every event.
//! - [`StatisticsHandler`] maintains running counters.
//!
//! All three tolerate re-delivery of an event they already processed, as long
//! as it is still within their window of recent event ids.

pub mod audit;
pub mod notification;
mod recent;
pub mod statistics;

pub use audit::{AuditEntry, AuditTrailHandler};
pub use notification::{
    InMemorySink, Notification, NotificationHandler, NotificationKind, NotificationSink,
};
pub use statistics::{StatisticsHandler, TaskhubStatistics};
