//! Taskhub Event Bus: in-process publish/subscribe for domain events.
//!
//! A single dispatcher task drains a bounded intake queue in FIFO order. For
//! each event it appends to the event store, resolves subscribed handlers and
//! runs them concurrently with retries, waiting for all of them before it
//! takes the next event.

pub mod bus;
pub mod config;
pub mod dead_letter;
pub mod dispatcher;
pub mod registry;
pub mod retry;

pub use bus::{BusStats, EventBus};
pub use config::{ConfigError, EventBusConfig};
pub use dead_letter::{DeadLetter, DeadLetterLog};
pub use dispatcher::{DispatchCounters, DispatchSnapshot};
pub use registry::HandlerRegistry;
pub use retry::RetryPolicy;
