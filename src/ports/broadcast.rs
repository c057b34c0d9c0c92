//! BroadcastPublisher port - ephemeral cross-instance relay.

use async_trait::async_trait;

use crate::domain::{BroadcastFrame, ChatError};

/// Fire-and-forget pub/sub to sockets held open on other instances.
///
/// Deliberately distinct from [`super::EventPublisher`]: no durability,
/// no ordering, no retry. Only re-derivable, latency-sensitive payloads
/// (typing indicators, sender echoes) travel here; a dropped frame is
/// simply dropped.
#[async_trait]
pub trait BroadcastPublisher: Send + Sync {
    async fn publish(&self, frame: &BroadcastFrame) -> Result<(), ChatError>;
}
