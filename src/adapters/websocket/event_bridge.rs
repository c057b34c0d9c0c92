//! Bridge from bus events to locally-connected sockets.
//!
//! One bridge per instance. For every `CHAT_MESSAGE_SENT` fact it
//! re-emits a `message` frame to the sockets subscribed to that room on
//! this instance - and nothing else: the message is already durable, so
//! the handler never writes.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{BroadcastFrame, BroadcastPayload, ChatError, ChatEvent, InstanceId};
use crate::ports::ChatEventHandler;

use super::dedup::RecentMessageIds;
use super::messages::{MessagePayload, ServerFrame};
use super::registry::RoomRegistry;

/// Re-emits durable chat events to local sockets, suppressing duplicates
/// by message id.
pub struct ChatEventBridge {
    registry: Arc<RoomRegistry>,
    seen: RecentMessageIds,
}

impl ChatEventBridge {
    pub fn new(registry: Arc<RoomRegistry>, dedup_capacity: usize) -> Self {
        Self {
            registry,
            seen: RecentMessageIds::new(dedup_capacity),
        }
    }

    /// Routes an ephemeral frame from the broadcast channel.
    ///
    /// Frames published by this instance are dropped: the origin already
    /// served its local sockets directly. Typing indicators are relayed
    /// as-is; message echoes run through the same dedup as bus events,
    /// so whichever path arrives first wins.
    pub async fn deliver_frame(&self, self_instance: InstanceId, frame: BroadcastFrame) {
        if frame.origin == self_instance {
            return;
        }
        match frame.payload {
            BroadcastPayload::Typing {
                room_id,
                user_id,
                user_name,
                is_typing,
            } => {
                let frame = ServerFrame::Typing {
                    room_id: room_id.clone(),
                    is_typing,
                    user_id,
                    user_name,
                };
                self.registry.broadcast(&room_id, &frame, None).await;
            }
            BroadcastPayload::MessageEcho { event } => self.deliver(event).await,
        }
    }

    /// Delivers one event to local room members.
    ///
    /// Shared by the bus subscription and the ephemeral echo path so both
    /// consult the same dedup set; whichever arrives first wins.
    pub async fn deliver(&self, event: ChatEvent) {
        if !event.is_message_sent() {
            tracing::debug!(event_type = %event.event_type, "Ignoring unknown chat event type");
            return;
        }

        if !self.seen.first_seen(&event.message_id) {
            tracing::trace!(
                message_id = %event.message_id,
                room_id = %event.room_id,
                "Suppressing duplicate delivery"
            );
            return;
        }

        let room_id = event.room_id.clone();
        let frame = ServerFrame::Message(MessagePayload::from_event(&event));
        let delivered = self.registry.broadcast(&room_id, &frame, None).await;

        tracing::debug!(
            message_id = %event.message_id,
            room_id = %room_id,
            delivered,
            "Re-emitted chat event to local sockets"
        );
    }
}

#[async_trait]
impl ChatEventHandler for ChatEventBridge {
    async fn handle(&self, event: ChatEvent) -> Result<(), ChatError> {
        self.deliver(event).await;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ChatEventBridge"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Message, MessageId, MessageKind, RoomId, Timestamp, UserId};
    use crate::domain::ConnectionId;
    use tokio::sync::mpsc;

    fn sample_event() -> ChatEvent {
        let message = Message {
            id: MessageId::new(),
            room_id: RoomId::parse("room_100001_100002").unwrap(),
            sender_id: UserId::new("100001").unwrap(),
            sender_name: "Alice".to_string(),
            content: "hello".to_string(),
            kind: MessageKind::Text,
            timestamp: Timestamp::now(),
        };
        ChatEvent::from_message(&message, None)
    }

    #[tokio::test]
    async fn event_reaches_subscribed_socket() {
        let registry = Arc::new(RoomRegistry::new());
        let bridge = ChatEventBridge::new(registry.clone(), 64);
        let event = sample_event();

        let (tx, mut rx) = mpsc::channel(16);
        registry.join(&event.room_id, ConnectionId::new(), tx).await;

        bridge.handle(event.clone()).await.unwrap();

        match rx.recv().await.unwrap() {
            ServerFrame::Message(payload) => {
                assert_eq!(payload.id, event.message_id.to_string());
                assert_eq!(payload.content, "hello");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }

    #[tokio::test]
    async fn duplicate_event_is_delivered_once() {
        let registry = Arc::new(RoomRegistry::new());
        let bridge = ChatEventBridge::new(registry.clone(), 64);
        let event = sample_event();

        let (tx, mut rx) = mpsc::channel(16);
        registry.join(&event.room_id, ConnectionId::new(), tx).await;

        // At-least-once transport: the same fact arrives twice.
        bridge.handle(event.clone()).await.unwrap();
        bridge.handle(event).await.unwrap();

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unknown_event_type_is_skipped() {
        let registry = Arc::new(RoomRegistry::new());
        let bridge = ChatEventBridge::new(registry.clone(), 64);

        let mut event = sample_event();
        event.event_type = "SOMETHING_ELSE".to_string();

        let (tx, mut rx) = mpsc::channel(16);
        registry.join(&event.room_id, ConnectionId::new(), tx).await;

        bridge.handle(event).await.unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn event_for_room_without_local_sockets_is_noop() {
        let registry = Arc::new(RoomRegistry::new());
        let bridge = ChatEventBridge::new(registry, 64);
        // No panic, no error.
        bridge.handle(sample_event()).await.unwrap();
    }

    #[tokio::test]
    async fn own_broadcast_frames_are_dropped() {
        let registry = Arc::new(RoomRegistry::new());
        let bridge = ChatEventBridge::new(registry.clone(), 64);
        let event = sample_event();
        let me = InstanceId::new();

        let (tx, mut rx) = mpsc::channel(16);
        registry.join(&event.room_id, ConnectionId::new(), tx).await;

        bridge
            .deliver_frame(me, BroadcastFrame::message_echo(me, event))
            .await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn remote_echo_then_bus_event_delivers_once() {
        let registry = Arc::new(RoomRegistry::new());
        let bridge = ChatEventBridge::new(registry.clone(), 64);
        let event = sample_event();
        let me = InstanceId::new();
        let remote = InstanceId::new();

        let (tx, mut rx) = mpsc::channel(16);
        registry.join(&event.room_id, ConnectionId::new(), tx).await;

        // Low-latency echo arrives first, durable event second.
        bridge
            .deliver_frame(me, BroadcastFrame::message_echo(remote, event.clone()))
            .await;
        bridge.handle(event).await.unwrap();

        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn remote_typing_frame_is_relayed() {
        let registry = Arc::new(RoomRegistry::new());
        let bridge = ChatEventBridge::new(registry.clone(), 64);
        let me = InstanceId::new();
        let remote = InstanceId::new();
        let room_id = crate::domain::RoomId::parse("room_100001_100002").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        registry.join(&room_id, ConnectionId::new(), tx).await;

        bridge
            .deliver_frame(
                me,
                BroadcastFrame::typing(
                    remote,
                    room_id.clone(),
                    UserId::new("100002").unwrap(),
                    "Bob".to_string(),
                    true,
                ),
            )
            .await;

        match rx.recv().await.unwrap() {
            ServerFrame::Typing {
                is_typing,
                user_name,
                ..
            } => {
                assert!(is_typing);
                assert_eq!(user_name, "Bob");
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }
}
