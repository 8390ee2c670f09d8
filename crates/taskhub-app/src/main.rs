//! Taskhub entry point: runs the sample workload through the event bus.

use std::error::Error;
use std::sync::Arc;

use taskhub_app::state::AppState;
use taskhub_app::workload;
use taskhub_core::clock::SystemClock;
use taskhub_event_bus::EventBusConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Taskhub event subsystem");

    // Read configuration from environment.
    let config = EventBusConfig::from_env()?;
    tracing::info!(?config, "configuration loaded");

    let state = AppState::new(config, Arc::new(SystemClock)).await?;
    state.bus.start().await?;

    let summary = workload::run(&state).await?;

    // Drains whatever the dispatcher has not processed yet.
    state.bus.stop().await?;
    workload::report(&state, &summary).await?;

    tracing::info!(events = summary.events_published, "Taskhub finished");
    Ok(())
}
