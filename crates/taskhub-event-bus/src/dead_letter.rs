//! Bounded log of handler invocations that exhausted their retries.
//!
//! Entries are diagnostics only. Nothing redelivers them.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use taskhub_core::payload::EventType;

/// One permanently failed handler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadLetter {
    /// Id of the event that could not be handled.
    pub event_id: Uuid,
    /// Type of that event.
    pub event_type: EventType,
    /// Name of the failing handler.
    pub handler: String,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// Message of the last failure.
    pub last_error: String,
    /// When the handler was declared failed.
    pub failed_at: DateTime<Utc>,
}

/// FIFO-bounded dead-letter log.
#[derive(Debug)]
pub struct DeadLetterLog {
    capacity: usize,
    entries: RwLock<VecDeque<DeadLetter>>,
}

impl DeadLetterLog {
    /// Creates an empty log retaining at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Appends an entry, dropping the oldest one when full.
    pub async fn record(&self, entry: DeadLetter) {
        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// All retained entries, oldest first.
    pub async fn entries(&self) -> Vec<DeadLetter> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// Number of retained entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the log is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dead_letter(attempts: u32) -> DeadLetter {
        DeadLetter {
            event_id: Uuid::new_v4(),
            event_type: EventType::TaskAssigned,
            handler: "notification".to_owned(),
            attempts,
            last_error: "smtp unavailable".to_owned(),
            failed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_oldest_entry_is_dropped_when_full() {
        // Arrange
        let log = DeadLetterLog::new(2);

        // Act
        log.record(dead_letter(1)).await;
        log.record(dead_letter(2)).await;
        log.record(dead_letter(3)).await;

        // Assert
        let attempts: Vec<u32> = log.entries().await.iter().map(|e| e.attempts).collect();
        assert_eq!(attempts, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_new_log_is_empty() {
        let log = DeadLetterLog::new(4);

        assert!(log.is_empty().await);
        assert_eq!(log.len().await, 0);
    }
}
