//! Redis configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Redis configuration: stream names for the durable bus, channel name
/// for the ephemeral broadcast.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Durable stream carrying CHAT_MESSAGE_SENT envelopes
    #[serde(default = "default_chat_stream")]
    pub chat_stream: String,

    /// Durable stream carrying room-creation facts
    #[serde(default = "default_room_stream")]
    pub room_stream: String,

    /// Pub/sub channel for ephemeral frames
    #[serde(default = "default_broadcast_channel")]
    pub broadcast_channel: String,

    /// Blocking-read window for the subscriber, in milliseconds
    #[serde(default = "default_read_block_ms")]
    pub read_block_ms: u64,

    /// Approximate retention per stream (MAXLEN ~)
    #[serde(default = "default_stream_maxlen")]
    pub stream_maxlen: usize,
}

impl RedisConfig {
    pub fn read_block(&self) -> Duration {
        Duration::from_millis(self.read_block_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS_URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        if self.chat_stream.is_empty()
            || self.room_stream.is_empty()
            || self.broadcast_channel.is_empty()
        {
            return Err(ValidationError::MissingRequired("redis stream names"));
        }
        Ok(())
    }
}

fn default_chat_stream() -> String {
    "chat-events".to_string()
}

fn default_room_stream() -> String {
    "friends-events".to_string()
}

fn default_broadcast_channel() -> String {
    "chat-broadcast".to_string()
}

fn default_read_block_ms() -> u64 {
    5000
}

fn default_stream_maxlen() -> usize {
    10_000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_url(url: &str) -> RedisConfig {
        RedisConfig {
            url: url.to_string(),
            chat_stream: default_chat_stream(),
            room_stream: default_room_stream(),
            broadcast_channel: default_broadcast_channel(),
            read_block_ms: default_read_block_ms(),
            stream_maxlen: default_stream_maxlen(),
        }
    }

    #[test]
    fn redis_urls_pass() {
        assert!(with_url("redis://localhost:6379").validate().is_ok());
        assert!(with_url("rediss://u:p@redis.example.com:6380").validate().is_ok());
    }

    #[test]
    fn other_schemes_fail() {
        assert!(with_url("http://localhost:6379").validate().is_err());
        assert!(with_url("").validate().is_err());
    }

    #[test]
    fn topic_names_default_to_the_original_wire_names() {
        let config = with_url("redis://localhost");
        assert_eq!(config.chat_stream, "chat-events");
        assert_eq!(config.room_stream, "friends-events");
    }
}
