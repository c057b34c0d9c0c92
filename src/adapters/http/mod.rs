//! HTTP adapter - synchronous fallback and initial-load surface.
//!
//! - `GET  /chats/{roomId}?limit&before` - paginated backlog
//! - `POST /chats/room` - create (or look up) a room
//! - `POST /chats/send` - multipart send with optional file upload
//! - `GET  /chats/rooms/mine` - rooms for the caller
//! - `GET  /health` - liveness probe
//!
//! Everything except `/health` requires a bearer token validated against
//! the identity collaborator.

mod dto;
mod handlers;

pub use dto::*;
pub use handlers::{chat_router, ApiError, CurrentUser, HttpAppState};
