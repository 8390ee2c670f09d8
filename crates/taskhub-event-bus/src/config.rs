//! Event bus configuration.
//!
//! All values are fixed at construction time; the bus never reconfigures
//! itself while running.

use std::str::FromStr;
use std::time::Duration;

use taskhub_event_store::DEFAULT_STORE_CAPACITY;
use thiserror::Error;

use crate::retry::RetryPolicy;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is set but cannot be parsed.
    #[error("{key} must be a non-negative integer, got {value:?}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// A capacity was configured as zero.
    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),
}

/// Constructor-time parameters of an [`EventBus`](crate::EventBus).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBusConfig {
    /// Capacity of the bounded intake queue.
    pub queue_capacity: usize,
    /// Attempts per handler invocation before it is declared failed.
    pub max_retries: u32,
    /// Base of the linear backoff between attempts.
    pub retry_base_delay: Duration,
    /// How long `publish` waits for queue capacity. Zero means no waiting.
    pub publish_timeout: Duration,
    /// Records retained by the default in-memory event store.
    pub store_capacity: usize,
    /// Permanently failed deliveries retained for diagnostics.
    pub dead_letter_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            publish_timeout: Duration::from_secs(5),
            store_capacity: DEFAULT_STORE_CAPACITY,
            dead_letter_capacity: 100,
        }
    }
}

impl EventBusConfig {
    /// Reads configuration from `TASKHUB_*` environment variables, falling
    /// back to defaults for unset ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is unparsable or a capacity is
    /// zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value is unparsable or a capacity is zero.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            queue_capacity: parse_or(&lookup, "TASKHUB_QUEUE_CAPACITY", defaults.queue_capacity)?,
            max_retries: parse_or(&lookup, "TASKHUB_MAX_RETRIES", defaults.max_retries)?,
            retry_base_delay: Duration::from_millis(parse_or(
                &lookup,
                "TASKHUB_RETRY_BASE_DELAY_MS",
                duration_millis(defaults.retry_base_delay),
            )?),
            publish_timeout: Duration::from_millis(parse_or(
                &lookup,
                "TASKHUB_PUBLISH_TIMEOUT_MS",
                duration_millis(defaults.publish_timeout),
            )?),
            store_capacity: parse_or(&lookup, "TASKHUB_STORE_CAPACITY", defaults.store_capacity)?,
            dead_letter_capacity: parse_or(
                &lookup,
                "TASKHUB_DEAD_LETTER_CAPACITY",
                defaults.dead_letter_capacity,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects zero capacities.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroCapacity`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("queue_capacity"));
        }
        if self.store_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("store_capacity"));
        }
        if self.dead_letter_capacity == 0 {
            return Err(ConfigError::ZeroCapacity("dead_letter_capacity"));
        }
        Ok(())
    }

    /// Retry policy derived from this configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_base_delay)
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
