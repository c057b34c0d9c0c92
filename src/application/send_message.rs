//! SendMessage command handler.
//!
//! The spine of the delivery pipeline: authorize, persist, echo, publish.
//! Persistence failures are terminal for the send; transport failures
//! after a successful persist are logged and swallowed - the message is
//! already durable and the sender already has it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

use crate::domain::{
    BroadcastFrame, ChatError, ChatEvent, Identity, InstanceId, Message, MessageKind, RoomId,
};
use crate::ports::{BroadcastPublisher, EventPublisher, MessageStore, RoomDirectory};

/// Command to send a message to a room.
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub room_id: RoomId,
    pub sender: Identity,
    pub content: String,
    pub kind: MessageKind,
    /// Client idempotency token, echoed back on the event for exact-match
    /// reconciliation.
    pub client_tag: Option<String>,
}

/// Per-room publish serialization.
///
/// Within one instance, persist and publish happen under the room's lock
/// so the bus order for a room always matches the store's write order,
/// even when two connections race a send to the same room. Sends to
/// different rooms proceed in parallel.
#[derive(Default)]
struct RoomLocks {
    locks: Mutex<HashMap<RoomId, Arc<tokio::sync::Mutex<()>>>>,
}

impl RoomLocks {
    async fn acquire(&self, room_id: &RoomId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().expect("room lock table poisoned");
            locks
                .entry(room_id.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Handles the send operation for both the WebSocket and HTTP surfaces.
#[derive(Clone)]
pub struct SendMessageHandler {
    directory: Arc<dyn RoomDirectory>,
    store: Arc<dyn MessageStore>,
    bus: Arc<dyn EventPublisher>,
    broadcast: Arc<dyn BroadcastPublisher>,
    instance: InstanceId,
    room_locks: Arc<RoomLocks>,
}

impl SendMessageHandler {
    pub fn new(
        directory: Arc<dyn RoomDirectory>,
        store: Arc<dyn MessageStore>,
        bus: Arc<dyn EventPublisher>,
        broadcast: Arc<dyn BroadcastPublisher>,
        instance: InstanceId,
    ) -> Self {
        Self {
            directory,
            store,
            bus,
            broadcast,
            instance,
            room_locks: Arc::new(RoomLocks::default()),
        }
    }

    /// Persists the message and fans it out.
    ///
    /// Returns the canonical message on success. The returned value is
    /// the sender's echo; the same fact reaches everyone else through the
    /// bus (and, on other instances, a head-start via the broadcast
    /// adapter).
    pub async fn handle(&self, command: SendMessageCommand) -> Result<Message, ChatError> {
        if command.content.trim().is_empty() {
            return Err(ChatError::validation("Message content cannot be empty"));
        }

        let authorized = self
            .directory
            .check_access(&command.room_id, &command.sender.user_id)
            .await?;
        if !authorized {
            return Err(ChatError::authorization(format!(
                "User {} is not a member of {}",
                command.sender.user_id, command.room_id
            )));
        }

        let _room_guard = self.room_locks.acquire(&command.room_id).await;

        let message = self
            .store
            .append(
                &command.room_id,
                &command.sender.user_id,
                &command.sender.name,
                &command.content,
                command.kind,
            )
            .await?;

        let event = ChatEvent::from_message(&message, command.client_tag);

        // Ephemeral head-start for sockets on other instances. Best
        // effort: a dropped frame costs nothing, the durable event follows.
        let echo = BroadcastFrame::message_echo(self.instance, event.clone());
        if let Err(err) = self.broadcast.publish(&echo).await {
            tracing::debug!(
                message_id = %message.id,
                "Ephemeral echo dropped: {}",
                err
            );
        }

        // Durable fan-out. The adapter retries with backoff; a terminal
        // failure loses the realtime push for this one event, never the
        // message itself.
        if let Err(err) = self.bus.publish(&event).await {
            tracing::warn!(
                message_id = %message.id,
                room_id = %message.room_id,
                "Event publish failed after retries, cross-instance fan-out lost: {}",
                err
            );
        }

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::{
        InMemoryBroadcast, InMemoryEventBus, InMemoryMessageStore, InMemoryRoomDirectory,
    };
    use crate::domain::UserId;
    use async_trait::async_trait;

    fn identity(id: &str, name: &str) -> Identity {
        Identity::new(UserId::new(id).unwrap(), name)
    }

    async fn room_with(directory: &InMemoryRoomDirectory, a: &str, b: &str) -> RoomId {
        directory
            .create_room(
                &[UserId::new(a).unwrap(), UserId::new(b).unwrap()],
                &UserId::new(a).unwrap(),
            )
            .await
            .unwrap()
    }

    fn handler(
        directory: Arc<InMemoryRoomDirectory>,
        store: Arc<InMemoryMessageStore>,
        bus: Arc<InMemoryEventBus>,
        broadcast: Arc<InMemoryBroadcast>,
    ) -> SendMessageHandler {
        SendMessageHandler::new(directory, store, bus, broadcast, InstanceId::new())
    }

    fn command(room_id: &RoomId, content: &str) -> SendMessageCommand {
        SendMessageCommand {
            room_id: room_id.clone(),
            sender: identity("100001", "Alice"),
            content: content.to_string(),
            kind: MessageKind::Text,
            client_tag: Some("tag-1".to_string()),
        }
    }

    #[tokio::test]
    async fn send_persists_then_publishes() {
        let directory = Arc::new(InMemoryRoomDirectory::new());
        let store = Arc::new(InMemoryMessageStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let broadcast = Arc::new(InMemoryBroadcast::new());
        let room_id = room_with(&directory, "100001", "100002").await;

        let handler = handler(directory, store.clone(), bus.clone(), broadcast.clone());
        let message = handler.handle(command(&room_id, "hello")).await.unwrap();

        assert_eq!(message.content, "hello");
        assert_eq!(store.query(&room_id, 50, None).await.unwrap().len(), 1);

        let published = bus.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].message_id, message.id);
        assert_eq!(published[0].client_tag.as_deref(), Some("tag-1"));

        // Echo frame carries the same event.
        assert_eq!(broadcast.frames().len(), 1);
    }

    #[tokio::test]
    async fn non_member_is_rejected_with_no_write() {
        let directory = Arc::new(InMemoryRoomDirectory::new());
        let store = Arc::new(InMemoryMessageStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let broadcast = Arc::new(InMemoryBroadcast::new());
        let room_id = room_with(&directory, "100002", "100003").await;

        let handler = handler(directory, store.clone(), bus.clone(), broadcast);
        let err = handler.handle(command(&room_id, "hi")).await.unwrap_err();

        assert_eq!(err.code(), "AUTHORIZATION_ERROR");
        assert!(store.query(&room_id, 50, None).await.unwrap().is_empty());
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn empty_content_is_rejected_before_io() {
        let directory = Arc::new(InMemoryRoomDirectory::new());
        let store = Arc::new(InMemoryMessageStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let broadcast = Arc::new(InMemoryBroadcast::new());
        let room_id = room_with(&directory, "100001", "100002").await;

        let handler = handler(directory, store.clone(), bus, broadcast);
        let err = handler.handle(command(&room_id, "   ")).await.unwrap_err();

        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert!(store.query(&room_id, 50, None).await.unwrap().is_empty());
    }

    /// Bus that always fails: the send must still succeed.
    struct DeadBus;

    #[async_trait]
    impl EventPublisher for DeadBus {
        async fn publish(&self, _event: &ChatEvent) -> Result<(), ChatError> {
            Err(ChatError::transport("bus unreachable"))
        }
    }

    #[tokio::test]
    async fn transport_failure_does_not_fail_the_send() {
        let directory = Arc::new(InMemoryRoomDirectory::new());
        let store = Arc::new(InMemoryMessageStore::new());
        let broadcast = Arc::new(InMemoryBroadcast::new());
        let room_id = room_with(&directory, "100001", "100002").await;

        let handler = SendMessageHandler::new(
            directory,
            store.clone(),
            Arc::new(DeadBus),
            broadcast,
            InstanceId::new(),
        );

        let message = handler.handle(command(&room_id, "hello")).await.unwrap();

        // Persisted and returned despite the bus being down.
        assert_eq!(store.query(&room_id, 50, None).await.unwrap().len(), 1);
        assert_eq!(message.content, "hello");
    }

    #[tokio::test]
    async fn bus_order_matches_store_order_under_racing_sends() {
        let directory = Arc::new(InMemoryRoomDirectory::new());
        let store = Arc::new(InMemoryMessageStore::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let broadcast = Arc::new(InMemoryBroadcast::new());
        let room_id = room_with(&directory, "100001", "100002").await;

        let handler = handler(directory, store.clone(), bus.clone(), broadcast);

        let mut tasks = Vec::new();
        for i in 0..16 {
            let handler = handler.clone();
            let room_id = room_id.clone();
            tasks.push(tokio::spawn(async move {
                handler
                    .handle(SendMessageCommand {
                        room_id,
                        sender: identity("100001", "Alice"),
                        content: format!("msg-{}", i),
                        kind: MessageKind::Text,
                        client_tag: None,
                    })
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let mut stored = store.query(&room_id, 50, None).await.unwrap();
        stored.reverse(); // chronological
        let published = bus.published();

        assert_eq!(stored.len(), 16);
        assert_eq!(published.len(), 16);
        for (message, event) in stored.iter().zip(published.iter()) {
            assert_eq!(message.id, event.message_id);
        }
    }
}
