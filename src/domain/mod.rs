//! Domain types for the chat delivery core.
//!
//! Everything in this module is transport- and storage-agnostic: plain
//! value objects, the message/room aggregates, the bus envelopes, and the
//! error taxonomy. Adapters depend on these types, never the other way
//! around.

mod errors;
mod events;
mod ids;
mod message;
mod room;
mod timestamp;

pub use errors::ChatError;
pub use events::{
    BroadcastFrame, BroadcastPayload, ChatEvent, RoomEvent, CHAT_MESSAGE_SENT, FRIEND_ADDED,
};
pub use ids::{ConnectionId, InstanceId, MessageId, RoomId, UserId};
pub use message::{Message, MessageKind};
pub use room::Room;
pub use timestamp::Timestamp;

/// Authenticated identity returned by the identity collaborator.
///
/// Carries only the claims the delivery path actually uses: who is
/// speaking and the display name attached to their messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub name: String,
}

impl Identity {
    pub fn new(user_id: UserId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
        }
    }
}
