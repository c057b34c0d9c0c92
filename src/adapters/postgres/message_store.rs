//! PostgreSQL implementation of MessageStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{ChatError, Message, MessageId, MessageKind, RoomId, Timestamp, UserId};
use crate::ports::MessageStore;

#[derive(Clone)]
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
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

        sqlx::query(
            r#"
            INSERT INTO messages (id, room_id, sender_id, sender_name, kind, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.room_id.as_str())
        .bind(message.sender_id.as_str())
        .bind(&message.sender_name)
        .bind(message.kind.as_str())
        .bind(&message.content)
        .bind(message.timestamp.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| ChatError::persistence(format!("Failed to insert message: {}", e)))?;

        Ok(message)
    }

    async fn query(
        &self,
        room_id: &RoomId,
        limit: u32,
        before: Option<Timestamp>,
    ) -> Result<Vec<Message>, ChatError> {
        let rows = match before {
            Some(before) => {
                sqlx::query(
                    r#"
                    SELECT id, room_id, sender_id, sender_name, kind, content, created_at
                    FROM messages
                    WHERE room_id = $1 AND created_at < $2
                    ORDER BY created_at DESC, id DESC
                    LIMIT $3
                    "#,
                )
                .bind(room_id.as_str())
                .bind(before.as_datetime())
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, room_id, sender_id, sender_name, kind, content, created_at
                    FROM messages
                    WHERE room_id = $1
                    ORDER BY created_at DESC, id DESC
                    LIMIT $2
                    "#,
                )
                .bind(room_id.as_str())
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| ChatError::persistence(format!("Failed to query messages: {}", e)))?;

        rows.into_iter().map(row_to_message).collect()
    }
}

fn row_to_message(row: sqlx::postgres::PgRow) -> Result<Message, ChatError> {
    let corrupt = |what: &str, e: String| {
        ChatError::persistence(format!("Corrupt message row ({}): {}", what, e))
    };

    let id: Uuid = row
        .try_get("id")
        .map_err(|e| corrupt("id", e.to_string()))?;
    let room_id: String = row
        .try_get("room_id")
        .map_err(|e| corrupt("room_id", e.to_string()))?;
    let sender_id: String = row
        .try_get("sender_id")
        .map_err(|e| corrupt("sender_id", e.to_string()))?;
    let sender_name: String = row
        .try_get("sender_name")
        .map_err(|e| corrupt("sender_name", e.to_string()))?;
    let kind: String = row
        .try_get("kind")
        .map_err(|e| corrupt("kind", e.to_string()))?;
    let content: String = row
        .try_get("content")
        .map_err(|e| corrupt("content", e.to_string()))?;
    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| corrupt("created_at", e.to_string()))?;

    Ok(Message {
        id: MessageId::from_uuid(id),
        room_id: RoomId::parse(room_id).map_err(|e| corrupt("room_id", e.to_string()))?,
        sender_id: UserId::new(sender_id).map_err(|e| corrupt("sender_id", e.to_string()))?,
        sender_name,
        content,
        kind: kind
            .parse()
            .map_err(|e: ChatError| corrupt("kind", e.to_string()))?,
        timestamp: Timestamp::from_datetime(created_at),
    })
}
