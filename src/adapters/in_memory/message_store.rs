//! In-memory MessageStore.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{ChatError, Message, MessageId, MessageKind, RoomId, Timestamp, UserId};
use crate::ports::MessageStore;

/// Append-only message log held in memory.
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<Message>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
        }
    }

    /// Total messages across all rooms.
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(
        &self,
        room_id: &RoomId,
        sender_id: &UserId,
        sender_name: &str,
        content: &str,
        kind: MessageKind,
    ) -> Result<Message, ChatError> {
        let message = Message {
            id: MessageId::new(),
            room_id: room_id.clone(),
            sender_id: sender_id.clone(),
            sender_name: sender_name.to_string(),
            content: content.to_string(),
            kind,
            timestamp: Timestamp::now(),
        };
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn query(
        &self,
        room_id: &RoomId,
        limit: u32,
        before: Option<Timestamp>,
    ) -> Result<Vec<Message>, ChatError> {
        let messages = self.messages.read().await;
        let mut page: Vec<Message> = messages
            .iter()
            .filter(|m| &m.room_id == room_id)
            .filter(|m| before.map(|b| m.timestamp.is_before(&b)).unwrap_or(true))
            .cloned()
            .collect();
        // Most-recent-first; ids break timestamp ties deterministically.
        page.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        page.truncate(limit as usize);
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(s: &str) -> RoomId {
        RoomId::parse(s).unwrap()
    }

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    #[tokio::test]
    async fn query_returns_most_recent_first() {
        let store = InMemoryMessageStore::new();
        let r = room("room_a_b");
        for content in ["one", "two", "three"] {
            store
                .append(&r, &user("100001"), "Alice", content, MessageKind::Text)
                .await
                .unwrap();
        }

        let page = store.query(&r, 50, None).await.unwrap();
        let contents: Vec<&str> = page.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["three", "two", "one"]);
    }

    #[tokio::test]
    async fn cursor_bound_is_strict() {
        let store = InMemoryMessageStore::new();
        let r = room("room_a_b");
        for i in 0..4 {
            store
                .append(&r, &user("100001"), "Alice", &i.to_string(), MessageKind::Text)
                .await
                .unwrap();
        }

        let newest = store.query(&r, 2, None).await.unwrap();
        let cursor = newest.last().unwrap().timestamp;
        let older = store.query(&r, 50, Some(cursor)).await.unwrap();

        assert_eq!(older.len(), 2);
        for message in older {
            assert!(message.timestamp.is_before(&cursor));
        }
    }

    #[tokio::test]
    async fn rooms_do_not_leak_into_each_other() {
        let store = InMemoryMessageStore::new();
        store
            .append(&room("room_a_b"), &user("1"), "A", "x", MessageKind::Text)
            .await
            .unwrap();

        assert!(store.query(&room("room_c_d"), 50, None).await.unwrap().is_empty());
    }
}
