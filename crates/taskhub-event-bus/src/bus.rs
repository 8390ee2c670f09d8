//! Event bus facade: lifecycle plus the publish/subscribe contract.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use taskhub_core::error::EventError;
use taskhub_core::event::EventRecord;
use taskhub_core::handler::EventHandler;
use taskhub_core::payload::EventType;
use taskhub_core::store::EventStore;
use taskhub_event_store::InMemoryEventStore;

use crate::config::EventBusConfig;
use crate::dead_letter::DeadLetterLog;
use crate::dispatcher::{DispatchCounters, DispatchSnapshot, Dispatcher};
use crate::registry::HandlerRegistry;

/// Read-only diagnostics snapshot of a bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusStats {
    /// Whether the bus accepts publishes.
    pub running: bool,
    /// Intake queue capacity.
    pub buffer_size: usize,
    /// Events waiting in the intake queue.
    pub pending: usize,
    /// Subscribers per event type tag.
    pub handler_counts: BTreeMap<String, usize>,
    /// Dispatcher totals.
    pub dispatch: DispatchSnapshot,
    /// Entries in the dead-letter log.
    pub dead_letters: usize,
}

/// State that exists only between `start` and `stop`.
struct Running {
    shutdown: watch::Sender<bool>,
    worker: JoinHandle<mpsc::Receiver<EventRecord>>,
}

/// In-process publish/subscribe bus.
///
/// Events published while the bus is running are queued, stored and handed
/// to every subscribed handler. Publishing never reports handler outcomes;
/// those surface through logs, [`stats`](Self::stats) and the dead-letter log.
pub struct EventBus {
    config: EventBusConfig,
    registry: Arc<HandlerRegistry>,
    store: Arc<dyn EventStore>,
    dead_letters: Arc<DeadLetterLog>,
    counters: Arc<DispatchCounters>,
    lifecycle: Mutex<Option<Running>>,
    sender: RwLock<Option<mpsc::Sender<EventRecord>>>,
}

impl EventBus {
    /// Creates a stopped bus backed by a fresh in-memory store.
    #[must_use]
    pub fn new(config: EventBusConfig) -> Self {
        let store = Arc::new(InMemoryEventStore::new(config.store_capacity));
        Self::with_store(config, store)
    }

    /// Creates a stopped bus writing to the given store.
    ///
    /// A zero `queue_capacity` is raised to 1; [`config`](Self::config) and
    /// [`stats`](Self::stats) report the capacity actually used.
    #[must_use]
    pub fn with_store(mut config: EventBusConfig, store: Arc<dyn EventStore>) -> Self {
        config.queue_capacity = config.queue_capacity.max(1);
        let dead_letters = Arc::new(DeadLetterLog::new(config.dead_letter_capacity));
        Self {
            config,
            registry: Arc::new(HandlerRegistry::new()),
            store,
            dead_letters,
            counters: Arc::new(DispatchCounters::default()),
            lifecycle: Mutex::new(None),
            sender: RwLock::new(None),
        }
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            registry: Arc::clone(&self.registry),
            store: Arc::clone(&self.store),
            dead_letters: Arc::clone(&self.dead_letters),
            counters: Arc::clone(&self.counters),
            retry: self.config.retry_policy(),
        }
    }

    /// Starts the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::AlreadyRunning`] if the bus is running.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<(), EventError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.is_some() {
            return Err(EventError::AlreadyRunning);
        }

        let (sender, queue) = mpsc::channel(self.config.queue_capacity);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(self.dispatcher().run(queue, shutdown_rx));

        *self.sender.write().await = Some(sender);
        *lifecycle = Some(Running { shutdown, worker });
        info!(
            queue_capacity = self.config.queue_capacity,
            max_retries = self.config.max_retries,
            "event bus started"
        );
        Ok(())
    }

    /// Stops the dispatcher and drains the queue.
    ///
    /// New publishes are refused immediately. The event being processed is
    /// allowed to finish, then every event still queued is dispatched before
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::NotRunning`] if the bus is stopped.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<(), EventError> {
        let mut lifecycle = self.lifecycle.lock().await;
        let running = lifecycle.take().ok_or(EventError::NotRunning)?;

        self.sender.write().await.take();
        // A send error means the dispatcher already exited on its own.
        let _ = running.shutdown.send(true);

        match running.worker.await {
            Ok(queue) => {
                let drained = self.dispatcher().drain(queue).await;
                info!(drained, "event bus stopped");
            }
            Err(err) => {
                error!(error = %err, "dispatcher task failed, queued events are lost");
            }
        }
        Ok(())
    }

    /// Whether the bus currently accepts publishes.
    pub async fn is_running(&self) -> bool {
        self.sender.read().await.is_some()
    }

    /// Enqueues one event.
    ///
    /// Waits at most the configured publish timeout for queue capacity.
    ///
    /// # Errors
    ///
    /// - [`EventError::NotRunning`] if the bus is stopped.
    /// - [`EventError::QueueFull`] if the queue is full and the timeout is zero.
    /// - [`EventError::Timeout`] if the queue stayed full for the whole timeout.
    #[instrument(skip(self, event), fields(event_id = %event.id(), event_type = %event.event_type()))]
    pub async fn publish(&self, event: EventRecord) -> Result<(), EventError> {
        let sender = self
            .sender
            .read()
            .await
            .clone()
            .ok_or(EventError::NotRunning)?;

        let event = match sender.try_send(event) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Closed(_)) => return Err(EventError::NotRunning),
            Err(TrySendError::Full(event)) => event,
        };

        let timeout = self.config.publish_timeout;
        if timeout.is_zero() {
            warn!(capacity = self.config.queue_capacity, "event queue full");
            return Err(EventError::QueueFull {
                capacity: self.config.queue_capacity,
            });
        }
        match sender.send_timeout(event, timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(_)) => {
                warn!(?timeout, "timed out waiting for queue capacity");
                Err(EventError::Timeout(timeout))
            }
            Err(SendTimeoutError::Closed(_)) => Err(EventError::NotRunning),
        }
    }

    /// Enqueues events in order, stopping at the first failure.
    ///
    /// Events before the failing one stay queued.
    ///
    /// # Errors
    ///
    /// Returns the error of the first event that could not be published.
    pub async fn publish_batch(&self, events: Vec<EventRecord>) -> Result<(), EventError> {
        for event in events {
            self.publish(event).await?;
        }
        Ok(())
    }

    /// Subscribes `handler` to `event_type`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::AlreadySubscribed`] if this instance is already
    /// subscribed to `event_type`.
    pub async fn subscribe(
        &self,
        event_type: EventType,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), EventError> {
        self.registry.subscribe(event_type, handler).await
    }

    /// Subscribes `handler` to every type it declares.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::AlreadySubscribed`] without registering anything
    /// if any of those subscriptions exists.
    pub async fn subscribe_all(&self, handler: Arc<dyn EventHandler>) -> Result<(), EventError> {
        self.registry.subscribe_all(handler).await
    }

    /// Removes this exact handler instance from `event_type`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::HandlerNotFound`] if it was not subscribed.
    pub async fn unsubscribe(
        &self,
        event_type: EventType,
        handler: &Arc<dyn EventHandler>,
    ) -> Result<(), EventError> {
        self.registry.unsubscribe(event_type, handler).await
    }

    /// The store events are written to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// The subscription table.
    #[must_use]
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Handler invocations that exhausted their retries.
    #[must_use]
    pub fn dead_letters(&self) -> &Arc<DeadLetterLog> {
        &self.dead_letters
    }

    /// The configuration the bus was built with.
    #[must_use]
    pub fn config(&self) -> &EventBusConfig {
        &self.config
    }

    /// Diagnostics snapshot.
    pub async fn stats(&self) -> BusStats {
        let (running, pending) = match self.sender.read().await.as_ref() {
            Some(sender) => (true, sender.max_capacity() - sender.capacity()),
            None => (false, 0),
        };
        BusStats {
            running,
            buffer_size: self.config.queue_capacity,
            pending,
            handler_counts: self.registry.handler_counts().await,
            dispatch: self.counters.snapshot(),
            dead_letters: self.dead_letters.len().await,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EventBusConfig::default())
    }
}
