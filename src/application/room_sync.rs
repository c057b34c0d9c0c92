//! Materializes rooms announced by the friend-management collaborator.
//!
//! The collaborator publishes `FRIEND_ADDED` facts on its own topic; this
//! handler persists the room and its participant rows so that sends into
//! the room authorize correctly on every instance. Replays are harmless:
//! every write is an upsert.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ChatError, RoomEvent, RoomId};
use crate::ports::{RoomDirectory, RoomEventHandler};

pub struct RoomEventMaterializer {
    directory: Arc<dyn RoomDirectory>,
}

impl RoomEventMaterializer {
    pub fn new(directory: Arc<dyn RoomDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl RoomEventHandler for RoomEventMaterializer {
    async fn handle(&self, event: RoomEvent) -> Result<(), ChatError> {
        if !event.is_friend_added() {
            tracing::debug!(event_type = %event.event_type, "Ignoring unknown room event type");
            return Ok(());
        }

        let room_id = match RoomId::parse(event.room_id.as_str()) {
            Ok(id) => id,
            Err(err) => {
                // A malformed fact must not kill the consumer loop.
                tracing::warn!(room_id = %event.room_id, "Skipping room event: {}", err);
                return Ok(());
            }
        };

        if event.participants.is_empty() {
            tracing::warn!(room_id = %room_id, "Skipping room event with no participants");
            return Ok(());
        }

        self.directory
            .materialize_room(&room_id, &event.participants, event.created_by.as_ref())
            .await?;

        tracing::info!(
            room_id = %room_id,
            participants = event.participants.len(),
            "Materialized room from collaborator event"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "RoomEventMaterializer"
    }
}
