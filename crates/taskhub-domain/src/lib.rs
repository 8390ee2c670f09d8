//! Taskhub domain: the aggregates that produce events for the bus.
//!
//! Each aggregate validates a command, raises an [`EventRecord`] and applies
//! it to itself. Raised events are handed over with
//! `take_uncommitted_events` and published by the caller. Aggregates can be
//! rebuilt from a store with [`application::replay::load`].
//!
//! [`EventRecord`]: taskhub_core::event::EventRecord

pub mod application;
pub mod domain;
