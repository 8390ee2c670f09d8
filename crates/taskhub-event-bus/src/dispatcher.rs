//! Dispatcher: drains the intake queue and fans events out to handlers.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use taskhub_core::event::EventRecord;
use taskhub_core::handler::EventHandler;
use taskhub_core::store::EventStore;

use crate::dead_letter::{DeadLetter, DeadLetterLog};
use crate::registry::HandlerRegistry;
use crate::retry::RetryPolicy;

/// Running totals kept by the dispatcher.
#[derive(Debug, Default)]
pub struct DispatchCounters {
    events_dispatched: AtomicU64,
    handler_successes: AtomicU64,
    handler_failures: AtomicU64,
    retries: AtomicU64,
    panics_caught: AtomicU64,
}

/// Point-in-time copy of [`DispatchCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSnapshot {
    /// Events taken off the queue and processed.
    pub events_dispatched: u64,
    /// Handler invocations that eventually succeeded.
    pub handler_successes: u64,
    /// Handler invocations that exhausted their retries.
    pub handler_failures: u64,
    /// Extra attempts made after a failure.
    pub retries: u64,
    /// Handler panics caught at the attempt boundary.
    pub panics_caught: u64,
}

impl DispatchCounters {
    /// Reads every counter.
    #[must_use]
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            handler_successes: self.handler_successes.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            panics_caught: self.panics_caught.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Processes events one at a time: persist, resolve handlers, fan out, join.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    pub(crate) registry: Arc<HandlerRegistry>,
    pub(crate) store: Arc<dyn EventStore>,
    pub(crate) dead_letters: Arc<DeadLetterLog>,
    pub(crate) counters: Arc<DispatchCounters>,
    pub(crate) retry: RetryPolicy,
}

impl Dispatcher {
    /// Consumes the queue until shutdown is signalled or every sender is gone.
    ///
    /// The event being processed when shutdown arrives is finished first.
    /// The receiver is handed back so the caller can drain what is left.
    pub(crate) async fn run(
        self,
        mut queue: mpsc::Receiver<EventRecord>,
        mut shutdown: watch::Receiver<bool>,
    ) -> mpsc::Receiver<EventRecord> {
        info!("dispatcher started");
        loop {
            let event = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                event = queue.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            self.dispatch(event).await;
        }
        info!("dispatcher stopped");
        queue
    }

    /// Closes the queue and dispatches every event still buffered in it.
    pub(crate) async fn drain(&self, mut queue: mpsc::Receiver<EventRecord>) -> usize {
        queue.close();
        let mut drained = 0;
        while let Some(event) = queue.recv().await {
            self.dispatch(event).await;
            drained += 1;
        }
        drained
    }

    /// Processes one event to completion.
    pub(crate) async fn dispatch(&self, event: EventRecord) {
        let event_id = event.id();
        let event_type = event.event_type();

        if let Err(err) = self.store.save(event.clone()).await {
            warn!(%event_id, %event_type, error = %err, "failed to store event, dispatching anyway");
        }
        DispatchCounters::bump(&self.counters.events_dispatched);

        let handlers: Vec<Arc<dyn EventHandler>> = self
            .registry
            .handlers_for(event_type)
            .await
            .into_iter()
            .filter(|h| h.can_handle(event_type))
            .collect();
        if handlers.is_empty() {
            debug!(%event_id, %event_type, "no handler for event");
            return;
        }

        let event = Arc::new(event);
        let mut deliveries = JoinSet::new();
        for handler in handlers {
            deliveries.spawn(deliver(
                handler,
                Arc::clone(&event),
                self.retry,
                Arc::clone(&self.dead_letters),
                Arc::clone(&self.counters),
            ));
        }
        while let Some(joined) = deliveries.join_next().await {
            if let Err(err) = joined {
                error!(%event_id, %event_type, error = %err, "delivery task aborted");
            }
        }
    }
}

/// Runs one handler against one event with retries and panic containment.
async fn deliver(
    handler: Arc<dyn EventHandler>,
    event: Arc<EventRecord>,
    retry: RetryPolicy,
    dead_letters: Arc<DeadLetterLog>,
    counters: Arc<DispatchCounters>,
) {
    let event_id = event.id();
    let event_type = event.event_type();
    let name = handler.name().to_owned();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let outcome = AssertUnwindSafe(handler.handle(&event))
            .catch_unwind()
            .await;

        let failure = match outcome {
            Ok(Ok(())) => {
                DispatchCounters::bump(&counters.handler_successes);
                if attempt > 1 {
                    info!(%event_id, %event_type, handler = %name, attempt, "handler recovered");
                }
                return;
            }
            Ok(Err(err)) => err.to_string(),
            Err(panic) => {
                DispatchCounters::bump(&counters.panics_caught);
                let message = panic_message(panic.as_ref());
                error!(%event_id, %event_type, handler = %name, attempt, panic = %message, "handler panicked");
                format!("handler panicked: {message}")
            }
        };

        if !retry.should_retry(attempt) {
            DispatchCounters::bump(&counters.handler_failures);
            error!(
                %event_id,
                %event_type,
                handler = %name,
                attempts = attempt,
                error = %failure,
                "handler failed permanently"
            );
            dead_letters
                .record(DeadLetter {
                    event_id,
                    event_type,
                    handler: name,
                    attempts: attempt,
                    last_error: failure,
                    failed_at: Utc::now(),
                })
                .await;
            return;
        }

        let delay = retry.delay_after(attempt);
        DispatchCounters::bump(&counters.retries);
        warn!(
            %event_id,
            %event_type,
            handler = %name,
            attempt,
            retry_in = ?delay,
            error = %failure,
            "handler attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
