//! Envelopes carried over the durable bus and the ephemeral broadcast
//! channel.
//!
//! A [`ChatEvent`] is a fact, not a command: it is produced exactly once
//! by the instance that persisted the message and consumed by every
//! instance's bridge, which re-emits it to locally-connected sockets
//! without ever re-persisting.

use serde::{Deserialize, Serialize};

use super::{InstanceId, Message, MessageId, MessageKind, RoomId, Timestamp, UserId};

/// Envelope type tag for message-sent facts on the chat-events topic.
pub const CHAT_MESSAGE_SENT: &str = "CHAT_MESSAGE_SENT";

/// Envelope type tag for room-creation facts on the friends-events topic.
pub const FRIEND_ADDED: &str = "FRIEND_ADDED";

/// Durable bus envelope for one persisted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub message_id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub content: String,
    pub msg_type: MessageKind,
    pub timestamp: Timestamp,
    /// Client-supplied idempotency token, echoed back verbatim so the
    /// sender can reconcile its optimistic echo by exact match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_tag: Option<String>,
}

impl ChatEvent {
    /// Builds the envelope for a freshly persisted message.
    pub fn from_message(message: &Message, client_tag: Option<String>) -> Self {
        Self {
            event_type: CHAT_MESSAGE_SENT.to_string(),
            message_id: message.id,
            room_id: message.room_id.clone(),
            sender_id: message.sender_id.clone(),
            sender_name: message.sender_name.clone(),
            content: message.content.clone(),
            msg_type: message.kind,
            timestamp: message.timestamp,
            client_tag,
        }
    }

    pub fn is_message_sent(&self) -> bool {
        self.event_type == CHAT_MESSAGE_SENT
    }
}

/// Room-creation fact emitted by the external friend-management
/// collaborator and materialized by the room directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub room_id: String,
    #[serde(default)]
    pub participants: Vec<UserId>,
    #[serde(default)]
    pub created_by: Option<UserId>,
    pub timestamp: Timestamp,
}

impl RoomEvent {
    pub fn is_friend_added(&self) -> bool {
        self.event_type == FRIEND_ADDED
    }
}

/// Ephemeral frame relayed through the broadcast adapter.
///
/// Stamped with the publishing instance so each listener can drop its own
/// frames (the origin already served its local sockets directly).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastFrame {
    pub origin: InstanceId,
    pub payload: BroadcastPayload,
}

impl BroadcastFrame {
    pub fn typing(
        origin: InstanceId,
        room_id: RoomId,
        user_id: UserId,
        user_name: String,
        is_typing: bool,
    ) -> Self {
        Self {
            origin,
            payload: BroadcastPayload::Typing {
                room_id,
                user_id,
                user_name,
                is_typing,
            },
        }
    }

    pub fn message_echo(origin: InstanceId, event: ChatEvent) -> Self {
        Self {
            origin,
            payload: BroadcastPayload::MessageEcho { event },
        }
    }
}

/// What an ephemeral frame carries: re-derivable, latency-sensitive data
/// only. A dropped frame is simply dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BroadcastPayload {
    #[serde(rename_all = "camelCase")]
    Typing {
        room_id: RoomId,
        user_id: UserId,
        user_name: String,
        is_typing: bool,
    },
    #[serde(rename_all = "camelCase")]
    MessageEcho { event: ChatEvent },
}
