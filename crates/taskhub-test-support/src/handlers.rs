//! Scripted `EventHandler` implementations for bus tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use taskhub_core::error::DomainError;
use taskhub_core::event::EventRecord;
use taskhub_core::handler::EventHandler;
use taskhub_core::payload::EventType;
use uuid::Uuid;

/// A handler that records the id of every event it receives and succeeds.
#[derive(Debug)]
pub struct RecordingHandler {
    name: String,
    event_types: Vec<EventType>,
    accepts: bool,
    received: Mutex<Vec<Uuid>>,
}

impl RecordingHandler {
    /// Creates a recording handler subscribed to `event_types`.
    #[must_use]
    pub fn new(name: &str, event_types: &[EventType]) -> Self {
        Self {
            name: name.to_owned(),
            event_types: event_types.to_vec(),
            accepts: true,
            received: Mutex::new(Vec::new()),
        }
    }

    /// A recording handler whose capability check always says no.
    #[must_use]
    pub fn refusing(name: &str, event_types: &[EventType]) -> Self {
        Self {
            accepts: false,
            ..Self::new(name, event_types)
        }
    }

    /// Ids of received events, in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn received(&self) -> Vec<Uuid> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn event_types(&self) -> Vec<EventType> {
        self.event_types.clone()
    }

    fn can_handle(&self, event_type: EventType) -> bool {
        self.accepts && self.event_types.contains(&event_type)
    }

    async fn handle(&self, event: &EventRecord) -> Result<(), DomainError> {
        self.received.lock().unwrap().push(event.id());
        Ok(())
    }
}

/// A handler that fails its first `failures` attempts, then succeeds.
#[derive(Debug)]
pub struct FlakyHandler {
    event_types: Vec<EventType>,
    failures: usize,
    attempts: AtomicUsize,
    handled: Mutex<Vec<Uuid>>,
}

impl FlakyHandler {
    /// Creates a handler failing `failures` times before succeeding.
    #[must_use]
    pub fn new(event_types: &[EventType], failures: usize) -> Self {
        Self {
            event_types: event_types.to_vec(),
            failures,
            attempts: AtomicUsize::new(0),
            handled: Mutex::new(Vec::new()),
        }
    }

    /// Total attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Ids of events handled successfully.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn handled(&self) -> Vec<Uuid> {
        self.handled.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for FlakyHandler {
    fn name(&self) -> &str {
        "flaky"
    }

    fn event_types(&self) -> Vec<EventType> {
        self.event_types.clone()
    }

    async fn handle(&self, event: &EventRecord) -> Result<(), DomainError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            return Err(DomainError::Infrastructure(format!(
                "transient failure on attempt {attempt}"
            )));
        }
        self.handled.lock().unwrap().push(event.id());
        Ok(())
    }
}

/// A handler that always returns an error.
#[derive(Debug)]
pub struct FailingHandler {
    event_types: Vec<EventType>,
    attempts: AtomicUsize,
}

impl FailingHandler {
    /// Creates an always-failing handler.
    #[must_use]
    pub fn new(event_types: &[EventType]) -> Self {
        Self {
            event_types: event_types.to_vec(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Total attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    fn event_types(&self) -> Vec<EventType> {
        self.event_types.clone()
    }

    async fn handle(&self, _event: &EventRecord) -> Result<(), DomainError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DomainError::Infrastructure("connection refused".into()))
    }
}

/// A handler that panics on every invocation.
#[derive(Debug)]
pub struct PanickingHandler {
    event_types: Vec<EventType>,
    attempts: AtomicUsize,
}

impl PanickingHandler {
    /// Creates an always-panicking handler.
    #[must_use]
    pub fn new(event_types: &[EventType]) -> Self {
        Self {
            event_types: event_types.to_vec(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Total attempts made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for PanickingHandler {
    fn name(&self) -> &str {
        "panicking"
    }

    fn event_types(&self) -> Vec<EventType> {
        self.event_types.clone()
    }

    async fn handle(&self, event: &EventRecord) -> Result<(), DomainError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        panic!("handler blew up on event {}", event.id());
    }
}

/// A handler that sleeps before recording the event.
#[derive(Debug)]
pub struct SlowHandler {
    event_types: Vec<EventType>,
    delay: Duration,
    completed: Mutex<Vec<Uuid>>,
}

impl SlowHandler {
    /// Creates a handler that takes `delay` per event.
    #[must_use]
    pub fn new(event_types: &[EventType], delay: Duration) -> Self {
        Self {
            event_types: event_types.to_vec(),
            delay,
            completed: Mutex::new(Vec::new()),
        }
    }

    /// Ids of events whose handling finished, in completion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn completed(&self) -> Vec<Uuid> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler for SlowHandler {
    fn name(&self) -> &str {
        "slow"
    }

    fn event_types(&self) -> Vec<EventType> {
        self.event_types.clone()
    }

    async fn handle(&self, event: &EventRecord) -> Result<(), DomainError> {
        tokio::time::sleep(self.delay).await;
        self.completed.lock().unwrap().push(event.id());
        Ok(())
    }
}
