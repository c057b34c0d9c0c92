//! JoinRoom command handler.
//!
//! Authorization is checked against the room's participant set before
//! anything is written: an outsider is rejected with no membership row
//! created. For legitimate members the participant index row is ensured
//! idempotently and the current backlog is returned in chronological
//! order for display.

use std::sync::Arc;

use crate::domain::{ChatError, Message, RoomId, UserId};
use crate::ports::{MessageStore, RoomDirectory};

/// Command to join a room on this connection.
#[derive(Debug, Clone)]
pub struct JoinRoomCommand {
    pub room_id: RoomId,
    pub user_id: UserId,
    /// Backlog page size for the `roomJoined` reply.
    pub backlog_limit: u32,
}

#[derive(Clone)]
pub struct JoinRoomHandler {
    directory: Arc<dyn RoomDirectory>,
    store: Arc<dyn MessageStore>,
}

impl JoinRoomHandler {
    pub fn new(directory: Arc<dyn RoomDirectory>, store: Arc<dyn MessageStore>) -> Self {
        Self { directory, store }
    }

    /// Returns the backlog, oldest first.
    pub async fn handle(&self, command: JoinRoomCommand) -> Result<Vec<Message>, ChatError> {
        let room = self.directory.get_room(&command.room_id).await?;
        let authorized = room
            .map(|r| r.has_participant(&command.user_id))
            .unwrap_or(false);
        if !authorized {
            return Err(ChatError::authorization(format!(
                "User {} cannot join {}",
                command.user_id, command.room_id
            )));
        }

        // Idempotent for existing members; keeps the by-user index
        // complete for rooms materialized before this user's row landed.
        self.directory
            .add_participant(&command.room_id, &command.user_id)
            .await?;

        let mut backlog = self
            .store
            .query(&command.room_id, command.backlog_limit, None)
            .await?;
        backlog.reverse();
        Ok(backlog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::{InMemoryMessageStore, InMemoryRoomDirectory};
    use crate::domain::MessageKind;

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    async fn setup() -> (Arc<InMemoryRoomDirectory>, Arc<InMemoryMessageStore>, RoomId) {
        let directory = Arc::new(InMemoryRoomDirectory::new());
        let store = Arc::new(InMemoryMessageStore::new());
        let room_id = directory
            .create_room(&[user("100001"), user("100002")], &user("100001"))
            .await
            .unwrap();
        (directory, store, room_id)
    }

    #[tokio::test]
    async fn member_receives_chronological_backlog() {
        let (directory, store, room_id) = setup().await;
        for content in ["first", "second", "third"] {
            store
                .append(&room_id, &user("100002"), "Bob", content, MessageKind::Text)
                .await
                .unwrap();
        }

        let handler = JoinRoomHandler::new(directory, store);
        let backlog = handler
            .handle(JoinRoomCommand {
                room_id,
                user_id: user("100001"),
                backlog_limit: 50,
            })
            .await
            .unwrap();

        let contents: Vec<&str> = backlog.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn outsider_is_rejected_without_membership_row() {
        let (directory, store, room_id) = setup().await;
        let handler = JoinRoomHandler::new(directory.clone(), store);

        let err = handler
            .handle(JoinRoomCommand {
                room_id: room_id.clone(),
                user_id: user("999999"),
                backlog_limit: 50,
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), "AUTHORIZATION_ERROR");
        assert!(!directory
            .check_access(&room_id, &user("999999"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn unknown_room_is_an_authorization_error() {
        let (directory, store, _) = setup().await;
        let handler = JoinRoomHandler::new(directory, store);

        let err = handler
            .handle(JoinRoomCommand {
                room_id: RoomId::parse("room_nowhere").unwrap(),
                user_id: user("100001"),
                backlog_limit: 50,
            })
            .await
            .unwrap_err();

        assert_eq!(err.code(), "AUTHORIZATION_ERROR");
    }

    #[tokio::test]
    async fn rejoin_is_idempotent() {
        let (directory, store, room_id) = setup().await;
        let handler = JoinRoomHandler::new(directory, store);
        let command = JoinRoomCommand {
            room_id,
            user_id: user("100001"),
            backlog_limit: 50,
        };

        assert!(handler.handle(command.clone()).await.is_ok());
        assert!(handler.handle(command).await.is_ok());
    }
}
