//! Request/response bodies for the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::domain::{Message, Room};

/// Error body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// One message as returned by the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_tag: Option<String>,
}

impl MessageDto {
    pub fn from_message(message: &Message, client_tag: Option<String>) -> Self {
        Self {
            id: message.id.to_string(),
            room_id: message.room_id.to_string(),
            sender_id: message.sender_id.to_string(),
            sender_name: message.sender_name.clone(),
            content: message.content.clone(),
            msg_type: message.kind.as_str().to_string(),
            timestamp: message.timestamp.to_rfc3339(),
            client_tag,
        }
    }
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self::from_message(message, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<MessageDto>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    pub participants: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDto {
    pub room_id: String,
    pub participants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: String,
}

impl From<&Room> for RoomDto {
    fn from(room: &Room) -> Self {
        Self {
            room_id: room.room_id.to_string(),
            participants: room.participants.iter().map(|p| p.to_string()).collect(),
            created_by: room.created_by.as_ref().map(|u| u.to_string()),
            created_at: room.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomsResponse {
    pub rooms: Vec<RoomDto>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageId, MessageKind, RoomId, Timestamp, UserId};

    #[test]
    fn message_dto_uses_wire_field_names() {
        let message = Message {
            id: MessageId::new(),
            room_id: RoomId::parse("room_1_2").unwrap(),
            sender_id: UserId::new("100001").unwrap(),
            sender_name: "Alice".to_string(),
            content: "hi".to_string(),
            kind: MessageKind::Sticker,
            timestamp: Timestamp::now(),
        };

        let json = serde_json::to_value(MessageDto::from(&message)).unwrap();
        assert_eq!(json["roomId"], "room_1_2");
        assert_eq!(json["senderId"], "100001");
        assert_eq!(json["type"], "sticker");
        assert!(json.get("clientTag").is_none());
    }
}
