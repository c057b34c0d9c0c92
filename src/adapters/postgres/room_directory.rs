//! PostgreSQL implementation of RoomDirectory.
//!
//! Idempotence comes from the schema: `room_id` is the primary key (for
//! pairs it is derived from the sorted user ids, so re-creation collides
//! with the existing row), and `(room_id, user_id)` is the participant
//! primary key. Every insert is `ON CONFLICT DO NOTHING`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::{ChatError, Room, RoomId, Timestamp, UserId};
use crate::ports::RoomDirectory;

#[derive(Clone)]
pub struct PostgresRoomDirectory {
    pool: PgPool,
}

impl PostgresRoomDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn upsert(
        &self,
        room_id: &RoomId,
        participants: &[UserId],
        created_by: Option<&UserId>,
    ) -> Result<(), ChatError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ChatError::persistence(format!("Failed to start transaction: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO rooms (room_id, created_by, created_at)
            VALUES ($1, $2, now())
            ON CONFLICT (room_id) DO NOTHING
            "#,
        )
        .bind(room_id.as_str())
        .bind(created_by.map(UserId::as_str))
        .execute(&mut *tx)
        .await
        .map_err(|e| ChatError::persistence(format!("Failed to insert room: {}", e)))?;

        for user_id in participants {
            sqlx::query(
                r#"
                INSERT INTO room_participants (room_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT (room_id, user_id) DO NOTHING
                "#,
            )
            .bind(room_id.as_str())
            .bind(user_id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| ChatError::persistence(format!("Failed to insert participant: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| ChatError::persistence(format!("Failed to commit room: {}", e)))
    }

    async fn participants_of(&self, room_id: &RoomId) -> Result<Vec<UserId>, ChatError> {
        let rows = sqlx::query(
            "SELECT user_id FROM room_participants WHERE room_id = $1 ORDER BY user_id",
        )
        .bind(room_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChatError::persistence(format!("Failed to load participants: {}", e)))?;

        rows.into_iter()
            .map(|row| {
                let user_id: String = row
                    .try_get("user_id")
                    .map_err(|e| ChatError::persistence(format!("Corrupt participant row: {}", e)))?;
                UserId::new(user_id)
                    .map_err(|e| ChatError::persistence(format!("Corrupt participant row: {}", e)))
            })
            .collect()
    }

    fn row_to_room(row: &sqlx::postgres::PgRow, participants: Vec<UserId>) -> Result<Room, ChatError> {
        let corrupt = |e: String| ChatError::persistence(format!("Corrupt room row: {}", e));

        let room_id: String = row.try_get("room_id").map_err(|e| corrupt(e.to_string()))?;
        let created_by: Option<String> = row
            .try_get("created_by")
            .map_err(|e| corrupt(e.to_string()))?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(Room::new(
            RoomId::parse(room_id).map_err(|e| corrupt(e.to_string()))?,
            participants,
            created_by
                .map(UserId::new)
                .transpose()
                .map_err(|e| corrupt(e.to_string()))?,
            Timestamp::from_datetime(created_at),
        ))
    }
}

#[async_trait]
impl RoomDirectory for PostgresRoomDirectory {
    async fn create_room(
        &self,
        participants: &[UserId],
        created_by: &UserId,
    ) -> Result<RoomId, ChatError> {
        let room_id = match participants {
            [a, b] => RoomId::for_pair(a, b),
            _ => RoomId::random(),
        };
        self.upsert(&room_id, participants, Some(created_by)).await?;
        Ok(room_id)
    }

    async fn materialize_room(
        &self,
        room_id: &RoomId,
        participants: &[UserId],
        created_by: Option<&UserId>,
    ) -> Result<(), ChatError> {
        self.upsert(room_id, participants, created_by).await
    }

    async fn check_access(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool, ChatError> {
        let row = sqlx::query(
            "SELECT 1 AS present FROM room_participants WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id.as_str())
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ChatError::persistence(format!("Membership probe failed: {}", e)))?;
        Ok(row.is_some())
    }

    async fn add_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), ChatError> {
        sqlx::query(
            r#"
            INSERT INTO room_participants (room_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (room_id, user_id) DO NOTHING
            "#,
        )
        .bind(room_id.as_str())
        .bind(user_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| ChatError::persistence(format!("Failed to add participant: {}", e)))?;
        Ok(())
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, ChatError> {
        let row = sqlx::query("SELECT room_id, created_by, created_at FROM rooms WHERE room_id = $1")
            .bind(room_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ChatError::persistence(format!("Failed to load room: {}", e)))?;

        match row {
            Some(row) => {
                let participants = self.participants_of(room_id).await?;
                Ok(Some(Self::row_to_room(&row, participants)?))
            }
            None => Ok(None),
        }
    }

    async fn rooms_for_user(&self, user_id: &UserId) -> Result<Vec<Room>, ChatError> {
        let rows = sqlx::query(
            r#"
            SELECT r.room_id, r.created_by, r.created_at
            FROM rooms r
            JOIN room_participants p ON p.room_id = r.room_id
            WHERE p.user_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ChatError::persistence(format!("Failed to list rooms: {}", e)))?;

        let mut rooms = Vec::with_capacity(rows.len());
        for row in rows {
            let room_id: String = row
                .try_get("room_id")
                .map_err(|e| ChatError::persistence(format!("Corrupt room row: {}", e)))?;
            let room_id = RoomId::parse(room_id)
                .map_err(|e| ChatError::persistence(format!("Corrupt room row: {}", e)))?;
            let participants = self.participants_of(&room_id).await?;
            rooms.push(Self::row_to_room(&row, participants)?);
        }
        Ok(rooms)
    }
}
