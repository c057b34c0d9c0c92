//! Delivery tuning: paging, retries, and per-connection buffers.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Backlog page size when the caller does not ask for one
    #[serde(default = "default_backlog_default_limit")]
    pub backlog_default_limit: u32,

    /// Hard cap on a backlog page
    #[serde(default = "default_backlog_max_limit")]
    pub backlog_max_limit: u32,

    /// Bounded publish retries before a fan-out is declared lost
    #[serde(default = "default_publish_retry_attempts")]
    pub publish_retry_attempts: u32,

    /// First retry delay; doubles per attempt
    #[serde(default = "default_publish_retry_base_ms")]
    pub publish_retry_base_ms: u64,

    /// Outbound frame buffer per connection
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Recent-message-id set size for duplicate suppression
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

impl DeliveryConfig {
    pub fn publish_retry_base(&self) -> Duration {
        Duration::from_millis(self.publish_retry_base_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.backlog_default_limit == 0 || self.backlog_max_limit == 0 {
            return Err(ValidationError::InvalidPageLimit);
        }
        if self.backlog_default_limit > self.backlog_max_limit {
            return Err(ValidationError::InvalidPageLimit);
        }
        if self.publish_retry_attempts == 0 {
            return Err(ValidationError::InvalidRetryPolicy);
        }
        Ok(())
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            backlog_default_limit: default_backlog_default_limit(),
            backlog_max_limit: default_backlog_max_limit(),
            publish_retry_attempts: default_publish_retry_attempts(),
            publish_retry_base_ms: default_publish_retry_base_ms(),
            outbound_buffer: default_outbound_buffer(),
            dedup_capacity: default_dedup_capacity(),
        }
    }
}

fn default_backlog_default_limit() -> u32 {
    50
}

fn default_backlog_max_limit() -> u32 {
    100
}

fn default_publish_retry_attempts() -> u32 {
    5
}

fn default_publish_retry_base_ms() -> u64 {
    300
}

fn default_outbound_buffer() -> usize {
    256
}

fn default_dedup_capacity() -> usize {
    4096
}
