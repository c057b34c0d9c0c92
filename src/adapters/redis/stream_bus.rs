//! Durable event bus over Redis Streams.
//!
//! One stream per topic, JSON payload in a single `payload` field.
//! Entries within a stream are totally ordered, which more than covers
//! the per-room ordering the pipeline needs: the publisher only XADDs
//! after the message is persisted, and sends to one room are serialized
//! by the sender's per-room lock.
//!
//! The subscriber is at-least-once: each instance tails both streams
//! independently, resuming from the last entry id it saw. Malformed
//! payloads are logged and skipped; connection loss reconnects with
//! backoff and resumes.

use std::sync::Arc;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::streams::{StreamMaxlen, StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{ChatError, ChatEvent, RoomEvent};
use crate::ports::{ChatEventHandler, EventPublisher, RoomEventHandler};

/// Bounded-retry policy for publishes.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        // Exponential: base, 2*base, 4*base, ...
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay: Duration::from_millis(300),
        }
    }
}

/// Publishing half of the bus.
#[derive(Clone)]
pub struct RedisEventBus {
    conn: MultiplexedConnection,
    chat_stream: String,
    maxlen: usize,
    retry: RetryPolicy,
}

impl RedisEventBus {
    pub fn new(
        conn: MultiplexedConnection,
        chat_stream: impl Into<String>,
        maxlen: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            conn,
            chat_stream: chat_stream.into(),
            maxlen,
            retry,
        }
    }

    async fn try_xadd(&self, payload: &str) -> Result<(), redis::RedisError> {
        let mut conn = self.conn.clone();
        let _id: String = conn
            .xadd_maxlen(
                self.chat_stream.as_str(),
                StreamMaxlen::Approx(self.maxlen),
                "*",
                &[("payload", payload)],
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for RedisEventBus {
    async fn publish(&self, event: &ChatEvent) -> Result<(), ChatError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| ChatError::transport(format!("Event serialization failed: {}", e)))?;

        let mut last_error = None;
        for attempt in 0..self.retry.attempts {
            match self.try_xadd(&payload).await {
                Ok(()) => {
                    if attempt > 0 {
                        tracing::info!(
                            message_id = %event.message_id,
                            attempt,
                            "Event published after retry"
                        );
                    }
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(
                        message_id = %event.message_id,
                        attempt,
                        "Event publish attempt failed: {}",
                        err
                    );
                    last_error = Some(err);
                    if attempt + 1 < self.retry.attempts {
                        tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(ChatError::transport(format!(
            "Event publish failed after {} attempts: {}",
            self.retry.attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

/// Consuming half of the bus: one long-running task per instance.
pub struct RedisEventSubscriber {
    client: redis::Client,
    chat_stream: String,
    room_stream: String,
    block: Duration,
}

impl RedisEventSubscriber {
    pub fn new(
        client: redis::Client,
        chat_stream: impl Into<String>,
        room_stream: impl Into<String>,
        block: Duration,
    ) -> Self {
        Self {
            client,
            chat_stream: chat_stream.into(),
            room_stream: room_stream.into(),
            block,
        }
    }

    /// Tails both streams until shutdown, dispatching chat events to the
    /// bridge and room events to the materializer. Never returns on a
    /// malformed payload or handler error; reconnects on transport loss.
    pub async fn run(
        &self,
        chat_handler: Arc<dyn ChatEventHandler>,
        room_handler: Arc<dyn RoomEventHandler>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        // "$" = only entries appended after this subscriber attached.
        let mut last_chat_id = "$".to_string();
        let mut last_room_id = "$".to_string();
        let mut reconnect_delay = Duration::from_millis(500);

        loop {
            if *shutdown.borrow() {
                return;
            }

            let mut conn = match self.client.get_multiplexed_async_connection().await {
                Ok(conn) => {
                    reconnect_delay = Duration::from_millis(500);
                    conn
                }
                Err(err) => {
                    tracing::warn!(
                        "Bus connection failed, retrying in {:?}: {}",
                        reconnect_delay,
                        err
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(reconnect_delay) => {}
                        _ = shutdown.changed() => return,
                    }
                    reconnect_delay = (reconnect_delay * 2).min(Duration::from_secs(30));
                    continue;
                }
            };

            tracing::info!(
                chat_stream = %self.chat_stream,
                room_stream = %self.room_stream,
                "Bus subscriber attached"
            );

            loop {
                let options = StreamReadOptions::default()
                    .block(self.block.as_millis() as usize)
                    .count(100);
                let keys = [self.chat_stream.as_str(), self.room_stream.as_str()];
                let ids = [last_chat_id.as_str(), last_room_id.as_str()];

                let reply: Result<StreamReadReply, redis::RedisError> = tokio::select! {
                    reply = conn.xread_options(&keys, &ids, &options) => reply,
                    _ = shutdown.changed() => return,
                };

                let reply = match reply {
                    Ok(reply) => reply,
                    Err(err) => {
                        tracing::warn!("Bus read failed, reconnecting: {}", err);
                        break;
                    }
                };

                for stream in reply.keys {
                    let is_chat = stream.key == self.chat_stream;
                    for entry in stream.ids {
                        // Advance the cursor first so a bad entry is
                        // never re-read on the next poll.
                        if is_chat {
                            last_chat_id = entry.id.clone();
                        } else {
                            last_room_id = entry.id.clone();
                        }

                        let payload: Option<String> = entry.get("payload");
                        let Some(payload) = payload else {
                            tracing::warn!(
                                stream = %stream.key,
                                entry = %entry.id,
                                "Skipping bus entry without payload"
                            );
                            continue;
                        };

                        if is_chat {
                            match serde_json::from_str::<ChatEvent>(&payload) {
                                Ok(event) => {
                                    if let Err(err) = chat_handler.handle(event).await {
                                        tracing::warn!(
                                            handler = chat_handler.name(),
                                            "Chat event handler failed: {}",
                                            err
                                        );
                                    }
                                }
                                Err(err) => {
                                    tracing::warn!(
                                        entry = %entry.id,
                                        "Skipping malformed chat event: {}",
                                        err
                                    );
                                }
                            }
                        } else {
                            match serde_json::from_str::<RoomEvent>(&payload) {
                                Ok(event) => {
                                    if let Err(err) = room_handler.handle(event).await {
                                        tracing::warn!(
                                            handler = room_handler.name(),
                                            "Room event handler failed: {}",
                                            err
                                        );
                                    }
                                }
                                Err(err) => {
                                    tracing::warn!(
                                        entry = %entry.id,
                                        "Skipping malformed room event: {}",
                                        err
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delays_grow_exponentially() {
        let policy = RetryPolicy {
            attempts: 5,
            base_delay: Duration::from_millis(300),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(300));
        assert_eq!(policy.delay_for(1), Duration::from_millis(600));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1200));
    }

    #[test]
    fn default_policy_matches_bounded_retry_contract() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(300));
    }
}
