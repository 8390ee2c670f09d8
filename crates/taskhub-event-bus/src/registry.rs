//! Handler registry: event type to ordered handler list.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use taskhub_core::error::EventError;
use taskhub_core::handler::EventHandler;
use taskhub_core::payload::EventType;

/// Subscription table shared by the bus facade and the dispatcher.
///
/// Handlers are compared by identity: two `Arc`s pointing at the same
/// allocation are the same subscriber, two equal-looking instances are not.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<EventType, Vec<Arc<dyn EventHandler>>>>,
}

fn same_handler(a: &Arc<dyn EventHandler>, b: &Arc<dyn EventHandler>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler` to the subscribers of `event_type`.
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
        let mut handlers = self.handlers.write().await;
        let subscribers = handlers.entry(event_type).or_default();
        if subscribers.iter().any(|h| same_handler(h, &handler)) {
            return Err(EventError::AlreadySubscribed {
                event_type,
                handler: handler.name().to_owned(),
            });
        }
        debug!(%event_type, handler = handler.name(), "handler subscribed");
        subscribers.push(handler);
        Ok(())
    }

    /// Subscribes `handler` to every type from its `event_types()`.
    ///
    /// Either every subscription is made or none is.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::AlreadySubscribed`] for the first type the
    /// instance is already subscribed to.
    pub async fn subscribe_all(&self, handler: Arc<dyn EventHandler>) -> Result<(), EventError> {
        let mut handlers = self.handlers.write().await;
        let event_types = handler.event_types();
        for event_type in &event_types {
            let taken = handlers
                .get(event_type)
                .is_some_and(|subs| subs.iter().any(|h| same_handler(h, &handler)));
            if taken {
                return Err(EventError::AlreadySubscribed {
                    event_type: *event_type,
                    handler: handler.name().to_owned(),
                });
            }
        }
        for event_type in event_types {
            let subscribers = handlers.entry(event_type).or_default();
            if !subscribers.iter().any(|h| same_handler(h, &handler)) {
                subscribers.push(Arc::clone(&handler));
            }
        }
        debug!(handler = handler.name(), "handler subscribed to all its event types");
        Ok(())
    }

    /// Removes this exact `handler` instance from `event_type`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::HandlerNotFound`] if it was not subscribed.
    pub async fn unsubscribe(
        &self,
        event_type: EventType,
        handler: &Arc<dyn EventHandler>,
    ) -> Result<(), EventError> {
        let mut handlers = self.handlers.write().await;
        let not_found = || EventError::HandlerNotFound {
            event_type,
            handler: handler.name().to_owned(),
        };
        let subscribers = handlers.get_mut(&event_type).ok_or_else(not_found)?;
        let position = subscribers
            .iter()
            .position(|h| same_handler(h, handler))
            .ok_or_else(not_found)?;
        subscribers.remove(position);
        if subscribers.is_empty() {
            handlers.remove(&event_type);
        }
        debug!(%event_type, handler = handler.name(), "handler unsubscribed");
        Ok(())
    }

    /// Snapshot of the subscribers of `event_type`, in subscription order.
    pub async fn handlers_for(&self, event_type: EventType) -> Vec<Arc<dyn EventHandler>> {
        self.handlers
            .read()
            .await
            .get(&event_type)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of subscribers per event type tag.
    pub async fn handler_counts(&self) -> BTreeMap<String, usize> {
        self.handlers
            .read()
            .await
            .iter()
            .map(|(event_type, subs)| (event_type.to_string(), subs.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskhub_test_support::RecordingHandler;

    fn recording(name: &str, types: &[EventType]) -> Arc<dyn EventHandler> {
        Arc::new(RecordingHandler::new(name, types))
    }

    #[tokio::test]
    async fn test_subscription_order_is_preserved() {
        // Arrange
        let registry = HandlerRegistry::new();
        let first = recording("first", &[EventType::TaskCreated]);
        let second = recording("second", &[EventType::TaskCreated]);

        // Act
        registry
            .subscribe(EventType::TaskCreated, Arc::clone(&first))
            .await
            .unwrap();
        registry
            .subscribe(EventType::TaskCreated, Arc::clone(&second))
            .await
            .unwrap();

        // Assert
        let names: Vec<String> = registry
            .handlers_for(EventType::TaskCreated)
            .await
            .iter()
            .map(|h| h.name().to_owned())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_same_instance_cannot_subscribe_twice() {
        let registry = HandlerRegistry::new();
        let handler = recording("audit", &[EventType::TaskCreated]);
        registry
            .subscribe(EventType::TaskCreated, Arc::clone(&handler))
            .await
            .unwrap();

        let result = registry.subscribe(EventType::TaskCreated, handler).await;

        assert_eq!(
            result,
            Err(EventError::AlreadySubscribed {
                event_type: EventType::TaskCreated,
                handler: "audit".to_owned(),
            })
        );
    }

    #[tokio::test]
    async fn test_equal_looking_instances_are_distinct_subscribers() {
        let registry = HandlerRegistry::new();

        registry
            .subscribe(EventType::TaskCreated, recording("twin", &[]))
            .await
            .unwrap();
        registry
            .subscribe(EventType::TaskCreated, recording("twin", &[]))
            .await
            .unwrap();

        assert_eq!(registry.handlers_for(EventType::TaskCreated).await.len(), 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_by_identity() {
        // Arrange
        let registry = HandlerRegistry::new();
        let keep = recording("keep", &[]);
        let removed = recording("removed", &[]);
        registry
            .subscribe(EventType::UserRegistered, Arc::clone(&keep))
            .await
            .unwrap();
        registry
            .subscribe(EventType::UserRegistered, Arc::clone(&removed))
            .await
            .unwrap();

        // Act
        registry
            .unsubscribe(EventType::UserRegistered, &removed)
            .await
            .unwrap();

        // Assert
        let remaining = registry.handlers_for(EventType::UserRegistered).await;
        assert_eq!(remaining.len(), 1);
        assert!(same_handler(&remaining[0], &keep));
    }

    #[tokio::test]
    async fn test_unsubscribe_unknown_handler_fails() {
        let registry = HandlerRegistry::new();
        let handler = recording("ghost", &[]);

        let result = registry
            .unsubscribe(EventType::ProjectArchived, &handler)
            .await;

        assert!(matches!(result, Err(EventError::HandlerNotFound { .. })));
    }

    #[tokio::test]
    async fn test_subscribe_all_is_all_or_nothing() {
        // Arrange
        let registry = HandlerRegistry::new();
        let handler = recording("stats", &[EventType::TaskCreated, EventType::TaskCompleted]);
        registry
            .subscribe(EventType::TaskCompleted, Arc::clone(&handler))
            .await
            .unwrap();

        // Act
        let result = registry.subscribe_all(Arc::clone(&handler)).await;

        // Assert
        assert!(matches!(result, Err(EventError::AlreadySubscribed { .. })));
        assert!(registry.handlers_for(EventType::TaskCreated).await.is_empty());
    }

    #[tokio::test]
    async fn test_handler_counts_by_type() {
        let registry = HandlerRegistry::new();
        let handler = recording("stats", &[EventType::TaskCreated, EventType::TaskCompleted]);

        registry.subscribe_all(handler).await.unwrap();

        let counts = registry.handler_counts().await;
        assert_eq!(counts.get("TaskCreated"), Some(&1));
        assert_eq!(counts.get("TaskCompleted"), Some(&1));
        assert_eq!(counts.len(), 2);
    }
}
