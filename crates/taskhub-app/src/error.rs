//! Application error types.

use taskhub_core::error::{DomainError, EventError};
use taskhub_event_bus::ConfigError;
use thiserror::Error;

/// Startup and runtime errors for the Taskhub binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The bus refused an operation.
    #[error("event bus error: {0}")]
    Event(#[from] EventError),

    /// An aggregate rejected a command.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// A diagnostics snapshot could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
