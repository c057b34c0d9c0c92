//! In-memory RoomDirectory.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{ChatError, Room, RoomId, Timestamp, UserId};
use crate::ports::RoomDirectory;

struct RoomRecord {
    participants: BTreeSet<UserId>,
    created_by: Option<UserId>,
    created_at: Timestamp,
}

/// Room registry held in memory.
pub struct InMemoryRoomDirectory {
    rooms: RwLock<HashMap<RoomId, RoomRecord>>,
}

impl InMemoryRoomDirectory {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

impl Default for InMemoryRoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomDirectory for InMemoryRoomDirectory {
    async fn create_room(
        &self,
        participants: &[UserId],
        created_by: &UserId,
    ) -> Result<RoomId, ChatError> {
        let room_id = match participants {
            [a, b] => RoomId::for_pair(a, b),
            _ => RoomId::random(),
        };

        let mut rooms = self.rooms.write().await;
        // Re-creating the same pair returns the existing room untouched.
        rooms.entry(room_id.clone()).or_insert_with(|| RoomRecord {
            participants: participants.iter().cloned().collect(),
            created_by: Some(created_by.clone()),
            created_at: Timestamp::now(),
        });
        Ok(room_id)
    }

    async fn materialize_room(
        &self,
        room_id: &RoomId,
        participants: &[UserId],
        created_by: Option<&UserId>,
    ) -> Result<(), ChatError> {
        let mut rooms = self.rooms.write().await;
        let record = rooms.entry(room_id.clone()).or_insert_with(|| RoomRecord {
            participants: BTreeSet::new(),
            created_by: created_by.cloned(),
            created_at: Timestamp::now(),
        });
        // Membership is append-only: replays and overlaps just merge.
        record.participants.extend(participants.iter().cloned());
        Ok(())
    }

    async fn check_access(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool, ChatError> {
        Ok(self
            .rooms
            .read()
            .await
            .get(room_id)
            .map(|r| r.participants.contains(user_id))
            .unwrap_or(false))
    }

    async fn add_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), ChatError> {
        if let Some(record) = self.rooms.write().await.get_mut(room_id) {
            record.participants.insert(user_id.clone());
        }
        Ok(())
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, ChatError> {
        Ok(self.rooms.read().await.get(room_id).map(|record| {
            Room::new(
                room_id.clone(),
                record.participants.iter().cloned().collect(),
                record.created_by.clone(),
                record.created_at,
            )
        }))
    }

    async fn rooms_for_user(&self, user_id: &UserId) -> Result<Vec<Room>, ChatError> {
        let rooms = self.rooms.read().await;
        let mut result: Vec<Room> = rooms
            .iter()
            .filter(|(_, record)| record.participants.contains(user_id))
            .map(|(room_id, record)| {
                Room::new(
                    room_id.clone(),
                    record.participants.iter().cloned().collect(),
                    record.created_by.clone(),
                    record.created_at,
                )
            })
            .collect();
        result.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        Ok(result)
    }
}
