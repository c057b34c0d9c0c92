//! Application layer - one handler per gateway operation.
//!
//! Handlers orchestrate ports only; they hold `Arc<dyn Port>` handles
//! injected at process start and carry no transport concerns. The
//! WebSocket and HTTP adapters both call into the same handlers.

mod backlog;
mod create_room;
mod join_room;
mod room_sync;
mod send_message;

pub use backlog::{BacklogLimits, BacklogQuery, FetchBacklogHandler};
pub use create_room::{CreateRoomCommand, CreateRoomHandler};
pub use join_room::{JoinRoomCommand, JoinRoomHandler};
pub use room_sync::RoomEventMaterializer;
pub use send_message::{SendMessageCommand, SendMessageHandler};
