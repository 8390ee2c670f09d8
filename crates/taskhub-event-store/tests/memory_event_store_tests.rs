//! Integration tests for `InMemoryEventStore` through the `EventStore` trait.

use chrono::Duration;
use taskhub_core::error::EventError;
use taskhub_core::event::EventRecord;
use taskhub_core::payload::EventType;
use taskhub_core::store::EventStore;
use taskhub_event_store::{DEFAULT_STORE_CAPACITY, InMemoryEventStore};
use taskhub_test_support::{fixed_time, sample_event, sample_event_at, sample_event_for};
use uuid::Uuid;

fn ids(events: &[EventRecord]) -> Vec<Uuid> {
    events.iter().map(EventRecord::id).collect()
}

// --- save ---

#[tokio::test]
async fn test_save_then_get_returns_the_record() {
    let store = InMemoryEventStore::default();
    let event = sample_event(EventType::TaskCreated);

    store.save(event.clone()).await.unwrap();

    assert_eq!(store.get(event.id()).await.unwrap(), event);
    assert_eq!(store.capacity(), DEFAULT_STORE_CAPACITY);
}

#[tokio::test]
async fn test_get_unknown_id_is_not_found() {
    let store = InMemoryEventStore::default();
    let id = Uuid::new_v4();

    assert_eq!(store.get(id).await, Err(EventError::NotFound(id)));
}

#[tokio::test]
async fn test_duplicate_id_is_rejected_and_count_unchanged() {
    // Arrange
    let store = InMemoryEventStore::new(10);
    let event = sample_event(EventType::TaskCreated);
    store.save(event.clone()).await.unwrap();

    // Act
    let result = store.save(event.clone()).await;

    // Assert
    assert_eq!(result, Err(EventError::DuplicateId(event.id())));
    assert_eq!(store.count().await, 1);
}

#[tokio::test]
async fn test_save_batch_is_all_or_nothing() {
    // Arrange
    let store = InMemoryEventStore::new(10);
    let existing = sample_event(EventType::TaskCreated);
    store.save(existing.clone()).await.unwrap();
    let fresh = sample_event(EventType::TaskAssigned);

    // Act
    let result = store
        .save_batch(vec![fresh.clone(), existing.clone()])
        .await;

    // Assert
    assert_eq!(result, Err(EventError::DuplicateId(existing.id())));
    assert_eq!(store.count().await, 1);
    assert_eq!(store.get(fresh.id()).await, Err(EventError::NotFound(fresh.id())));
}

#[tokio::test]
async fn test_save_batch_rejects_repeated_id_inside_the_batch() {
    let store = InMemoryEventStore::new(10);
    let event = sample_event(EventType::UserRegistered);

    let result = store.save_batch(vec![event.clone(), event.clone()]).await;

    assert_eq!(result, Err(EventError::DuplicateId(event.id())));
    assert_eq!(store.count().await, 0);
}

// --- bounded retention ---

#[tokio::test]
async fn test_only_most_recent_records_are_retained() {
    // Arrange
    let store = InMemoryEventStore::new(3);
    let events: Vec<EventRecord> = (0..7)
        .map(|_| sample_event(EventType::ProjectCreated))
        .collect();

    // Act
    for event in &events {
        store.save(event.clone()).await.unwrap();
    }

    // Assert
    assert_eq!(store.count().await, 3);
    assert_eq!(ids(&store.snapshot().await), ids(&events[4..]));
}

#[tokio::test]
async fn test_batch_larger_than_capacity_keeps_its_tail() {
    let store = InMemoryEventStore::new(2);
    let events: Vec<EventRecord> = (0..5)
        .map(|_| sample_event(EventType::TaskCreated))
        .collect();

    store.save_batch(events.clone()).await.unwrap();

    assert_eq!(ids(&store.snapshot().await), ids(&events[3..]));
}

// --- queries ---

#[tokio::test]
async fn test_get_events_filters_by_aggregate_and_sorts_by_version() {
    // Arrange
    let store = InMemoryEventStore::new(10);
    let task_id = Uuid::new_v4();
    let v2 = sample_event_for(task_id, 2, EventType::TaskAssigned);
    let v1 = sample_event_for(task_id, 1, EventType::TaskCreated);
    let v3 = sample_event_for(task_id, 3, EventType::TaskCompleted);
    store.save(v2.clone()).await.unwrap();
    store.save(sample_event(EventType::TaskCreated)).await.unwrap();
    store.save(v1.clone()).await.unwrap();
    store.save(v3.clone()).await.unwrap();

    // Act
    let all = store.get_events(task_id, 1).await;
    let tail = store.get_events(task_id, 2).await;

    // Assert
    assert_eq!(ids(&all), vec![v1.id(), v2.id(), v3.id()]);
    assert_eq!(ids(&tail), vec![v2.id(), v3.id()]);
}

#[tokio::test]
async fn test_get_events_by_type_returns_most_recent_in_order() {
    // Arrange
    let store = InMemoryEventStore::new(20);
    let created: Vec<EventRecord> = (0..4)
        .map(|_| sample_event(EventType::TaskCreated))
        .collect();
    for event in &created {
        store.save(event.clone()).await.unwrap();
        store
            .save(sample_event(EventType::TaskDeleted))
            .await
            .unwrap();
    }

    // Act
    let limited = store.get_events_by_type(EventType::TaskCreated, 2).await;
    let none = store.get_events_by_type(EventType::UserDeactivated, 10).await;

    // Assert
    assert_eq!(ids(&limited), ids(&created[2..]));
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_time_range_is_inclusive_and_limited() {
    // Arrange
    let store = InMemoryEventStore::new(20);
    let base = fixed_time();
    let events: Vec<EventRecord> = (0..5)
        .map(|minutes| sample_event_at(EventType::TaskStatusChanged, base + Duration::minutes(minutes)))
        .collect();
    store.save_batch(events.clone()).await.unwrap();

    // Act
    let window = store
        .get_events_by_time_range(base + Duration::minutes(1), base + Duration::minutes(3), 10)
        .await;
    let limited = store
        .get_events_by_time_range(base, base + Duration::minutes(4), 2)
        .await;

    // Assert
    assert_eq!(ids(&window), ids(&events[1..4]));
    assert_eq!(ids(&limited), ids(&events[3..]));
}

// --- stats ---

#[tokio::test]
async fn test_stats_break_down_retained_records() {
    // Arrange
    let store = InMemoryEventStore::new(10);
    let base = fixed_time();
    store
        .save(sample_event_at(EventType::TaskCreated, base))
        .await
        .unwrap();
    store
        .save(sample_event_at(EventType::TaskCreated, base + Duration::hours(1)))
        .await
        .unwrap();
    store
        .save(sample_event_at(EventType::UserRegistered, base - Duration::hours(1)))
        .await
        .unwrap();

    // Act
    let stats = store.stats().await;

    // Assert
    assert_eq!(stats.total, 3);
    assert_eq!(stats.capacity, 10);
    assert_eq!(stats.by_event_type.get("TaskCreated"), Some(&2));
    assert_eq!(stats.by_event_type.get("UserRegistered"), Some(&1));
    assert_eq!(stats.by_aggregate_type.get("Task"), Some(&2));
    assert_eq!(stats.by_aggregate_type.get("User"), Some(&1));
    assert_eq!(stats.oldest, Some(base - Duration::hours(1)));
    assert_eq!(stats.newest, Some(base + Duration::hours(1)));
}

#[tokio::test]
async fn test_stats_of_empty_store() {
    let store = InMemoryEventStore::new(5);

    let stats = store.stats().await;

    assert_eq!(stats.total, 0);
    assert!(stats.by_event_type.is_empty());
    assert_eq!(stats.oldest, None);
}
