//! The message aggregate: created exactly once by the store, immutable after.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{ChatError, MessageId, RoomId, Timestamp, UserId};

/// What a message body contains.
///
/// For `Image` and `File` the content is a URL resolved by the media
/// collaborator before persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    File,
    Sticker,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::File => "file",
            MessageKind::Sticker => "sticker",
        }
    }

    /// True when the content is an uploaded object URL rather than text.
    pub fn is_media(&self) -> bool {
        matches!(self, MessageKind::Image | MessageKind::File)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageKind::Text),
            "image" => Ok(MessageKind::Image),
            "file" => Ok(MessageKind::File),
            "sticker" => Ok(MessageKind::Sticker),
            other => Err(ChatError::validation(format!(
                "Unknown message type: {}",
                other
            ))),
        }
    }
}

/// A persisted chat message.
///
/// Immutable once written. The id is time-derived (UUIDv7) and the
/// timestamp is always server-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub content: String,
    pub kind: MessageKind,
    pub timestamp: Timestamp,
}
