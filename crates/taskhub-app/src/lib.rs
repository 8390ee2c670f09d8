//! Taskhub application wiring.
//!
//! Builds an [`EventBus`](taskhub_event_bus::EventBus) from environment
//! configuration, subscribes the downstream handlers and drives a sample
//! workload through the domain aggregates.

pub mod error;
pub mod state;
pub mod workload;
