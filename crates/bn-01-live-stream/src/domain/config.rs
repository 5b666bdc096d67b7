//! Live consumer configuration.

use shared_types::ConfigError;

/// Default producer-liveness window of a live consumer.
pub const DEFAULT_CONSUMER_TIMEOUT_MILLIS: u64 = 1500;

/// Configuration for live consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerConfig {
    timeout_threshold_millis: u64,
}

impl ConsumerConfig {
    /// Create a validated configuration; the threshold must be positive.
    pub fn new(timeout_threshold_millis: u64) -> Result<Self, ConfigError> {
        if timeout_threshold_millis == 0 {
            return Err(ConfigError::NonPositive {
                name: "consumer timeout threshold",
                value: 0,
            });
        }
        Ok(Self {
            timeout_threshold_millis,
        })
    }

    #[must_use]
    pub fn timeout_threshold_millis(&self) -> u64 {
        self.timeout_threshold_millis
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            timeout_threshold_millis: DEFAULT_CONSUMER_TIMEOUT_MILLIS,
        }
    }
}
