//! Taskhub Event Store: the bounded, indexed log of dispatched events.
//!
//! Durability is out of scope: the store lives in memory and forgets the
//! oldest records once it reaches capacity.

pub mod memory_event_store;

pub use memory_event_store::{DEFAULT_STORE_CAPACITY, InMemoryEventStore};
