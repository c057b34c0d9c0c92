//! MessageStore port - append-only, time-ordered message persistence.

use async_trait::async_trait;

use crate::domain::{ChatError, Message, MessageKind, RoomId, Timestamp, UserId};

/// Append-only persistence for chat messages.
///
/// # Contract
///
/// - `append` assigns a time-ordered unique id and a server timestamp,
///   writes a single atomic record, and fails with
///   `ChatError::Persistence` on storage unavailability. No partial
///   writes.
/// - `query` pages backward: at most `limit` messages with timestamp
///   strictly less than `before` (newest page when `before` is `None`),
///   most-recent-first. Callers chain pages by passing the oldest seen
///   timestamp as the next cursor.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(
        &self,
        room_id: &RoomId,
        sender_id: &UserId,
        sender_name: &str,
        content: &str,
        kind: MessageKind,
    ) -> Result<Message, ChatError>;

    async fn query(
        &self,
        room_id: &RoomId,
        limit: u32,
        before: Option<Timestamp>,
    ) -> Result<Vec<Message>, ChatError>;
}
