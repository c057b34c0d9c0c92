//! The room aggregate: a chat channel with an append-only participant set.

use serde::{Deserialize, Serialize};

use super::{RoomId, Timestamp, UserId};

/// A chat room and its membership.
///
/// Never deleted in normal operation; the participant set only grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub room_id: RoomId,
    pub participants: Vec<UserId>,
    pub created_by: Option<UserId>,
    pub created_at: Timestamp,
}

impl Room {
    pub fn new(
        room_id: RoomId,
        participants: Vec<UserId>,
        created_by: Option<UserId>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            room_id,
            participants,
            created_by,
            created_at,
        }
    }

    /// Membership probe against the loaded participant set.
    pub fn has_participant(&self, user_id: &UserId) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(s: &str) -> UserId {
        UserId::new(s).unwrap()
    }

    #[test]
    fn has_participant_checks_membership() {
        let room = Room::new(
            RoomId::for_pair(&user("100001"), &user("100002")),
            vec![user("100001"), user("100002")],
            Some(user("100001")),
            Timestamp::now(),
        );
        assert!(room.has_participant(&user("100001")));
        assert!(!room.has_participant(&user("999999")));
    }
}
