//! Sample workload: a small team sets up a project and works through tasks.

use serde::Serialize;
use taskhub_core::aggregate::AggregateRoot;
use taskhub_core::event::EventRecord;
use taskhub_core::payload::TaskStatus;
use taskhub_domain::application::replay;
use taskhub_domain::domain::project::Project;
use taskhub_domain::domain::task::Task;
use taskhub_domain::domain::user::User;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

const TASK_TITLES: [&str; 3] = [
    "Draft release notes",
    "Fix flaky integration test",
    "Update dependencies",
];

/// Identifiers of the aggregates created by [`run`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadSummary {
    /// Correlation id shared by every raised event.
    pub correlation_id: Uuid,
    /// Project owner.
    pub owner_id: Uuid,
    /// Member the tasks are assigned to.
    pub member_id: Uuid,
    /// The project.
    pub project_id: Uuid,
    /// Tasks in creation order.
    pub task_ids: Vec<Uuid>,
    /// Number of events handed to the bus.
    pub events_published: usize,
}

/// Raises the workload's events and publishes them in causal order.
///
/// The bus must be running.
///
/// # Errors
///
/// Returns [`AppError::Domain`] if an aggregate rejects a command and
/// [`AppError::Event`] if the bus refuses an event.
#[instrument(skip(state))]
pub async fn run(state: &AppState) -> Result<WorkloadSummary, AppError> {
    let clock = state.clock.as_ref();
    let correlation_id = Uuid::new_v4();

    let mut owner = User::register(
        Uuid::new_v4(),
        "owner@taskhub.dev",
        "Olivia Owner",
        correlation_id,
        clock,
    )?;
    let mut member = User::register(
        Uuid::new_v4(),
        "member@taskhub.dev",
        "Max Member",
        correlation_id,
        clock,
    )?;
    let mut project = Project::create(
        Uuid::new_v4(),
        "Spring release",
        owner.id,
        correlation_id,
        clock,
    )?;
    project.add_member(member.id, owner.id, correlation_id, clock)?;

    let mut tasks = Vec::with_capacity(TASK_TITLES.len());
    for (position, title) in TASK_TITLES.into_iter().enumerate() {
        let mut task = Task::create(
            Uuid::new_v4(),
            project.id,
            title,
            owner.id,
            correlation_id,
            clock,
        )?;
        task.assign(member.id, owner.id, correlation_id, clock)?;
        match position {
            0 => {
                task.change_status(TaskStatus::InProgress, correlation_id, clock)?;
                task.complete(member.id, correlation_id, clock)?;
            }
            1 => task.change_status(TaskStatus::Review, correlation_id, clock)?,
            _ => {}
        }
        tasks.push(task);
    }

    let mut events: Vec<EventRecord> = Vec::new();
    events.extend(owner.take_uncommitted_events());
    events.extend(member.take_uncommitted_events());
    events.extend(project.take_uncommitted_events());
    for task in &mut tasks {
        events.extend(task.take_uncommitted_events());
    }

    let events_published = events.len();
    state.bus.publish_batch(events).await?;
    info!(events_published, %correlation_id, "sample workload published");

    Ok(WorkloadSummary {
        correlation_id,
        owner_id: owner.id,
        member_id: member.id,
        project_id: project.id,
        task_ids: tasks.iter().map(|t| t.id).collect(),
        events_published,
    })
}

/// Logs the diagnostics of a stopped bus and rebuilds the workload's tasks
/// from the event store.
///
/// # Errors
///
/// Returns [`AppError::Domain`] if a task cannot be replayed and
/// [`AppError::Serialization`] if a snapshot cannot be encoded.
pub async fn report(state: &AppState, summary: &WorkloadSummary) -> Result<(), AppError> {
    let bus_stats = serde_json::to_string(&state.bus.stats().await)?;
    let store_stats = serde_json::to_string(&state.bus.store().stats().await)?;
    let statistics = serde_json::to_string(&state.statistics.snapshot().await)?;
    info!(bus = %bus_stats, store = %store_stats, statistics = %statistics, "diagnostics");

    for dead in state.bus.dead_letters().entries().await {
        info!(
            event_id = %dead.event_id,
            handler = %dead.handler,
            attempts = dead.attempts,
            error = %dead.last_error,
            "dead letter"
        );
    }

    for task_id in &summary.task_ids {
        let task: Task = replay::load(state.bus.store().as_ref(), *task_id).await?;
        info!(
            %task_id,
            title = task.title(),
            status = ?task.status(),
            version = task.version(),
            "task rebuilt from store"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use taskhub_event_bus::EventBusConfig;
    use taskhub_handlers::NotificationKind;
    use taskhub_test_support::{FixedClock, fixed_time};

    async fn state() -> AppState {
        let config = EventBusConfig {
            retry_base_delay: Duration::from_millis(1),
            ..EventBusConfig::default()
        };
        AppState::new(config, Arc::new(FixedClock(fixed_time())))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_workload_requires_running_bus() {
        let state = state().await;

        let result = run(&state).await;

        assert!(matches!(
            result,
            Err(AppError::Event(taskhub_core::error::EventError::NotRunning))
        ));
    }

    #[tokio::test]
    async fn test_workload_reaches_handlers_and_store() {
        // Arrange
        let state = state().await;
        state.bus.start().await.unwrap();

        // Act
        let summary = run(&state).await.unwrap();
        state.bus.stop().await.unwrap();

        // Assert
        // 2 registrations, 2 project events, 3 creations, 3 assignments,
        // 2 status changes, 1 completion.
        assert_eq!(summary.events_published, 13);
        assert_eq!(state.bus.store().count().await, 13);
        assert_eq!(state.audit.len().await, 13);

        let stats = state.statistics.snapshot().await;
        assert_eq!(stats.tasks_created, 3);
        assert_eq!(stats.tasks_completed, 1);
        assert_eq!(stats.open_tasks, 2);

        let assignments = state
            .notifications
            .sent()
            .await
            .iter()
            .filter(|n| {
                n.kind == NotificationKind::TaskAssigned && n.recipient_id == summary.member_id
            })
            .count();
        assert_eq!(assignments, 3);

        report(&state, &summary).await.unwrap();
    }

    #[tokio::test]
    async fn test_tasks_replay_to_their_final_status() {
        let state = state().await;
        state.bus.start().await.unwrap();
        let summary = run(&state).await.unwrap();
        state.bus.stop().await.unwrap();

        let mut statuses = Vec::new();
        for task_id in &summary.task_ids {
            let task: Task = replay::load(state.bus.store().as_ref(), *task_id)
                .await
                .unwrap();
            statuses.push(task.status());
        }

        assert_eq!(
            statuses,
            vec![TaskStatus::Done, TaskStatus::Review, TaskStatus::Todo]
        );
    }
}
