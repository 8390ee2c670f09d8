//! Taskhub Core: shared abstractions for the domain-event subsystem.
//!
//! This crate defines the event record, the closed payload set, the handler
//! and event-store contracts, and the error taxonomy that the bus, the store
//! and the aggregates share. It contains no runtime machinery.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod event;
pub mod handler;
pub mod narrow;
pub mod payload;
pub mod store;
