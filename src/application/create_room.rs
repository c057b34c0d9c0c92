//! CreateRoom command handler.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::domain::{ChatError, RoomId, UserId};
use crate::ports::RoomDirectory;

/// Command to create (or look up) a room for a participant set.
#[derive(Debug, Clone)]
pub struct CreateRoomCommand {
    pub participants: Vec<UserId>,
    pub created_by: UserId,
}

#[derive(Clone)]
pub struct CreateRoomHandler {
    directory: Arc<dyn RoomDirectory>,
}

impl CreateRoomHandler {
    pub fn new(directory: Arc<dyn RoomDirectory>) -> Self {
        Self { directory }
    }

    /// Creates the room, or returns the existing id for a two-party pair.
    ///
    /// The caller must be in the participant set; duplicates are
    /// collapsed before the id is derived.
    pub async fn handle(&self, command: CreateRoomCommand) -> Result<RoomId, ChatError> {
        let unique: BTreeSet<UserId> = command.participants.iter().cloned().collect();

        if unique.len() < 2 {
            return Err(ChatError::validation(
                "A room needs at least two distinct participants",
            ));
        }
        if !unique.contains(&command.created_by) {
            return Err(ChatError::validation(
                "Participants must include the requesting user",
            ));
        }

        let participants: Vec<UserId> = unique.into_iter().collect();
        self.directory
            .create_room(&participants, &command.created_by)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::InMemoryRoomDirectory;

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    fn handler() -> (Arc<InMemoryRoomDirectory>, CreateRoomHandler) {
        let directory = Arc::new(InMemoryRoomDirectory::new());
        (directory.clone(), CreateRoomHandler::new(directory))
    }

    #[tokio::test]
    async fn pair_creation_is_idempotent_regardless_of_order() {
        let (_, handler) = handler();

        let first = handler
            .handle(CreateRoomCommand {
                participants: vec![user("100001"), user("100002")],
                created_by: user("100001"),
            })
            .await
            .unwrap();

        let second = handler
            .handle(CreateRoomCommand {
                participants: vec![user("100002"), user("100001")],
                created_by: user("100002"),
            })
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn caller_must_be_a_participant() {
        let (_, handler) = handler();
        let err = handler
            .handle(CreateRoomCommand {
                participants: vec![user("100002"), user("100003")],
                created_by: user("100001"),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn single_participant_is_rejected() {
        let (_, handler) = handler();
        let err = handler
            .handle(CreateRoomCommand {
                participants: vec![user("100001"), user("100001")],
                created_by: user("100001"),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn members_of_new_room_pass_the_access_check() {
        let (directory, handler) = handler();
        let room_id = handler
            .handle(CreateRoomCommand {
                participants: vec![user("100001"), user("100002"), user("100003")],
                created_by: user("100001"),
            })
            .await
            .unwrap();

        for id in ["100001", "100002", "100003"] {
            assert!(directory.check_access(&room_id, &user(id)).await.unwrap());
        }
        assert!(!directory.check_access(&room_id, &user("999999")).await.unwrap());
    }
}
