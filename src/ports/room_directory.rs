//! RoomDirectory port - room identity, membership, and authorization.

use async_trait::async_trait;

use crate::domain::{ChatError, Room, RoomId, UserId};

/// Owns room identity and the participant index.
///
/// # Contract
///
/// - `create_room` is idempotent for two-party rooms: the id is derived
///   from the sorted user pair, and re-creation returns the existing id.
/// - `check_access` is a pure membership probe: `false` for unknown
///   rooms, never an error.
/// - `add_participant` and `materialize_room` tolerate replays
///   (membership is append-only, inserts are upserts).
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Creates a room for the given participants and returns its id.
    async fn create_room(
        &self,
        participants: &[UserId],
        created_by: &UserId,
    ) -> Result<RoomId, ChatError>;

    /// Persists a room announced by the external friend-management
    /// collaborator. Idempotent.
    async fn materialize_room(
        &self,
        room_id: &RoomId,
        participants: &[UserId],
        created_by: Option<&UserId>,
    ) -> Result<(), ChatError>;

    /// Membership probe consulted before join/send.
    async fn check_access(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool, ChatError>;

    /// Idempotently ensures the participant index row exists.
    async fn add_participant(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), ChatError>;

    /// Loads a room with its participant set, or `None` if unknown.
    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, ChatError>;

    /// Enumerates the rooms a user participates in.
    async fn rooms_for_user(&self, user_id: &UserId) -> Result<Vec<Room>, ChatError>;
}
