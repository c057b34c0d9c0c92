//! WebSocket adapter: the realtime side of the connection gateway.
//!
//! - [`handler`] - handshake authentication + per-connection loop
//! - [`registry`] - local room subscriptions for this instance
//! - [`event_bridge`] - bus/broadcast events re-emitted to local sockets
//! - [`messages`] - the JSON wire protocol
//! - [`dedup`] - bounded message-id set backing at-least-once tolerance

mod dedup;
mod event_bridge;
mod handler;
mod messages;
mod registry;

pub use event_bridge::ChatEventBridge;
pub use handler::{gateway_router, ws_handler, GatewayState};
pub use messages::{ClientFrame, MessagePayload, ServerFrame};
pub use registry::{FrameSender, RoomRegistry};
