//! Event bus ports - durable, at-least-once fan-out between instances.

use async_trait::async_trait;

use crate::domain::{ChatError, ChatEvent, RoomEvent};

/// Publishes durable facts to the bus.
///
/// # Contract
///
/// - At-least-once: consumers may see duplicates and must tolerate them.
/// - Entries for one room are ordered relative to each other.
/// - Implementations retry transient failures a bounded number of times
///   with backoff; a terminal failure is `ChatError::Transport` and the
///   caller decides whether it is fatal (it never is after a successful
///   persist).
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &ChatEvent) -> Result<(), ChatError>;
}

/// Consumes message-sent facts on an instance.
///
/// Handlers must be idempotent (the transport is at-least-once) and must
/// never re-persist: the message is already durable.
#[async_trait]
pub trait ChatEventHandler: Send + Sync {
    async fn handle(&self, event: ChatEvent) -> Result<(), ChatError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}

/// Consumes room-creation facts from the friend-management collaborator.
#[async_trait]
pub trait RoomEventHandler: Send + Sync {
    async fn handle(&self, event: RoomEvent) -> Result<(), ChatError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}
