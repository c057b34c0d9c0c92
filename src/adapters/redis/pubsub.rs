//! Ephemeral broadcast over Redis PUB/SUB.
//!
//! Carries typing indicators and sender echoes between instances. One
//! publish attempt, no replay: anything that matters durably travels on
//! the stream bus instead.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::sync::watch;

use crate::adapters::websocket::ChatEventBridge;
use crate::domain::{BroadcastFrame, ChatError, InstanceId};
use crate::ports::BroadcastPublisher;

/// Publishing half of the broadcast adapter.
#[derive(Clone)]
pub struct RedisBroadcast {
    conn: MultiplexedConnection,
    channel: String,
}

impl RedisBroadcast {
    pub fn new(conn: MultiplexedConnection, channel: impl Into<String>) -> Self {
        Self {
            conn,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl BroadcastPublisher for RedisBroadcast {
    async fn publish(&self, frame: &BroadcastFrame) -> Result<(), ChatError> {
        let payload = serde_json::to_string(frame)
            .map_err(|e| ChatError::transport(format!("Frame serialization failed: {}", e)))?;

        let mut conn = self.conn.clone();
        let _receivers: i64 = conn
            .publish(self.channel.as_str(), payload)
            .await
            .map_err(|e| ChatError::transport(format!("Broadcast publish failed: {}", e)))?;
        Ok(())
    }
}

/// Listening half: relays remote frames into this instance's sockets.
pub struct RedisBroadcastListener {
    client: redis::Client,
    channel: String,
    instance: InstanceId,
}

impl RedisBroadcastListener {
    pub fn new(client: redis::Client, channel: impl Into<String>, instance: InstanceId) -> Self {
        Self {
            client,
            channel: channel.into(),
            instance,
        }
    }

    /// Subscribes until shutdown. Frames published by this instance are
    /// skipped by the bridge; malformed frames are dropped - by contract
    /// nothing on this channel is worth retrying.
    pub async fn run(&self, bridge: Arc<ChatEventBridge>, mut shutdown: watch::Receiver<bool>) {
        let mut reconnect_delay = Duration::from_millis(500);

        loop {
            if *shutdown.borrow() {
                return;
            }

            let mut pubsub = match self.client.get_async_pubsub().await {
                Ok(pubsub) => pubsub,
                Err(err) => {
                    tracing::warn!(
                        "Broadcast subscribe failed, retrying in {:?}: {}",
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

            if let Err(err) = pubsub.subscribe(self.channel.as_str()).await {
                tracing::warn!("Broadcast channel subscribe failed: {}", err);
                tokio::select! {
                    _ = tokio::time::sleep(reconnect_delay) => {}
                    _ = shutdown.changed() => return,
                }
                reconnect_delay = (reconnect_delay * 2).min(Duration::from_secs(30));
                continue;
            }
            reconnect_delay = Duration::from_millis(500);
            tracing::info!(channel = %self.channel, "Broadcast listener attached");

            let mut messages = pubsub.on_message();
            loop {
                let message = tokio::select! {
                    message = messages.next() => message,
                    _ = shutdown.changed() => return,
                };

                let Some(message) = message else {
                    tracing::warn!("Broadcast connection lost, reconnecting");
                    break;
                };

                let payload: String = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(err) => {
                        tracing::debug!("Dropping unreadable broadcast frame: {}", err);
                        continue;
                    }
                };

                match serde_json::from_str::<BroadcastFrame>(&payload) {
                    Ok(frame) => bridge.deliver_frame(self.instance, frame).await,
                    Err(err) => {
                        tracing::debug!("Dropping malformed broadcast frame: {}", err);
                    }
                }
            }
        }
    }
}
