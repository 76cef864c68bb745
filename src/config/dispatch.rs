//! Dispatch configuration (retry bounds, timeouts, buffer capacity)

use serde::Deserialize;
use std::time::Duration;

use crate::dispatch::RetryPolicy;

use super::error::ValidationError;

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_ms() -> u64 {
    50
}

fn default_send_timeout_ms() -> u64 {
    5_000
}

fn default_channel_capacity() -> usize {
    128
}

/// Settings for outbound notification delivery
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Delivery attempts per connection, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the first retry; doubles each further retry
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Upper bound for one send
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Per-connection outbound buffer capacity
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff_ms(),
            send_timeout_ms: default_send_timeout_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl DispatchConfig {
    /// Validate dispatch settings
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidMaxAttempts);
        }
        if self.send_timeout_ms == 0 {
            return Err(ValidationError::InvalidSendTimeout);
        }
        if self.channel_capacity == 0 {
            return Err(ValidationError::InvalidChannelCapacity);
        }
        Ok(())
    }

    /// The retry policy these settings describe
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_backoff: Duration::from_millis(self.base_backoff_ms),
            send_timeout: Duration::from_millis(self.send_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = DispatchConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.channel_capacity, 128);
    }

    #[test]
    fn zero_attempts_fails_validation() {
        let config = DispatchConfig {
            max_attempts: 0,
            ..DispatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn retry_policy_mirrors_settings() {
        let config = DispatchConfig {
            max_attempts: 5,
            base_backoff_ms: 20,
            send_timeout_ms: 1_000,
            channel_capacity: 64,
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_backoff, Duration::from_millis(20));
        assert_eq!(policy.send_timeout, Duration::from_millis(1_000));
    }
}
