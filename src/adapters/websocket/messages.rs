//! Wire protocol between gateway and connected clients.
//!
//! Frames are JSON, tagged by `event`:
//! - Client → Server: `joinRoom`, `sendMessage`, `typing`
//! - Server → Client: `roomJoined`, `message`, `typing`, `error`

use serde::{Deserialize, Serialize};

use crate::domain::{ChatEvent, Message, RoomId, UserId};

// ============================================
// Client → Server Frames
// ============================================

/// All frames a client may send after the handshake.
///
/// Room ids arrive as raw strings and are validated by the gateway so a
/// malformed id produces an `error` frame, not a deserialization drop.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    JoinRoom { room_id: String },

    #[serde(rename_all = "camelCase")]
    SendMessage {
        room_id: String,
        content: String,
        #[serde(rename = "type")]
        msg_type: String,
        #[serde(default)]
        client_tag: Option<String>,
    },

    #[serde(rename_all = "camelCase")]
    Typing { room_id: String, is_typing: bool },
}

// ============================================
// Server → Client Frames
// ============================================

/// All frames the gateway sends to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ServerFrame {
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_id: RoomId,
        messages: Vec<MessagePayload>,
    },

    Message(MessagePayload),

    #[serde(rename_all = "camelCase")]
    Typing {
        room_id: RoomId,
        is_typing: bool,
        user_id: UserId,
        user_name: String,
    },

    Error { message: String },
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            message: message.into(),
        }
    }
}

/// One message as rendered on the wire.
///
/// Identical whether it arrives as the sender's echo or as the
/// authoritative bus event; only the `clientTag` (present on the echo
/// and on events for the originating send) lets the client join the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub id: String,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_tag: Option<String>,
}

impl MessagePayload {
    pub fn from_message(message: &Message, client_tag: Option<String>) -> Self {
        Self {
            id: message.id.to_string(),
            room_id: message.room_id.clone(),
            sender_id: message.sender_id.clone(),
            sender_name: message.sender_name.clone(),
            content: message.content.clone(),
            msg_type: message.kind.as_str().to_string(),
            timestamp: message.timestamp.to_rfc3339(),
            client_tag,
        }
    }

    pub fn from_event(event: &ChatEvent) -> Self {
        Self {
            id: event.message_id.to_string(),
            room_id: event.room_id.clone(),
            sender_id: event.sender_id.clone(),
            sender_name: event.sender_name.clone(),
            content: event.content.clone(),
            msg_type: event.msg_type.as_str().to_string(),
            timestamp: event.timestamp.to_rfc3339(),
            client_tag: event.client_tag.clone(),
        }
    }
}
