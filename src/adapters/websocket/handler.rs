//! WebSocket gateway: handshake authentication and the per-connection
//! loop.
//!
//! Lifecycle: `CONNECTING -> AUTHENTICATED -> (JOINED(room))* ->
//! DISCONNECTED`. Authentication happens before the upgrade and fails
//! closed; after that, one task drains the outbound channel to the
//! socket while this loop decodes inbound frames and dispatches them.
//! Disconnect tears down every room subscription exactly once.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::application::{JoinRoomCommand, JoinRoomHandler, SendMessageCommand, SendMessageHandler};
use crate::domain::{BroadcastFrame, ConnectionId, Identity, InstanceId, RoomId};
use crate::ports::{BroadcastPublisher, IdentityValidator};

use super::messages::{ClientFrame, MessagePayload, ServerFrame};
use super::registry::{FrameSender, RoomRegistry};

/// Everything a connection needs, injected once at process start.
#[derive(Clone)]
pub struct GatewayState {
    pub registry: Arc<RoomRegistry>,
    pub identity: Arc<dyn IdentityValidator>,
    pub join_room: JoinRoomHandler,
    pub send_message: SendMessageHandler,
    pub broadcast: Arc<dyn BroadcastPublisher>,
    pub instance: InstanceId,
    /// Hard bound on the handshake round-trip to the identity
    /// collaborator; expiry fails closed.
    pub auth_timeout: Duration,
    pub backlog_limit: u32,
    pub outbound_buffer: usize,
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// `GET /ws?token=...` - authenticate, then upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<GatewayState>,
) -> Response {
    let Some(token) = query.token else {
        return (StatusCode::UNAUTHORIZED, "No token provided").into_response();
    };

    let identity = match timeout(state.auth_timeout, state.identity.validate(&token)).await {
        Ok(Ok(identity)) => identity,
        Ok(Err(err)) => {
            tracing::debug!("Handshake rejected: {}", err);
            return (StatusCode::UNAUTHORIZED, "Invalid token").into_response();
        }
        Err(_) => {
            tracing::warn!("Identity validation timed out, failing closed");
            return (StatusCode::UNAUTHORIZED, "Authentication timeout").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, identity, state))
}

async fn handle_socket(socket: WebSocket, identity: Identity, state: GatewayState) {
    let connection_id = ConnectionId::new();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerFrame>(state.outbound_buffer);

    tracing::info!(
        connection_id = %connection_id,
        user_id = %identity.user_id,
        "Connection authenticated"
    );

    // Outbound pump: everything addressed to this socket - direct
    // replies, room broadcasts, bridge re-emissions - funnels through one
    // channel and leaves in queue order.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(err) => {
                    tracing::error!("Frame serialization failed: {}", err);
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_rx.next().await {
        let message = match result {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(connection_id = %connection_id, "Receive error: {}", err);
                break;
            }
        };

        match message {
            WsMessage::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(frame) => {
                    dispatch(frame, &identity, connection_id, &tx, &state).await;
                }
                Err(_) => {
                    let _ = tx.send(ServerFrame::error("Invalid message data")).await;
                }
            },
            WsMessage::Binary(_) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    "Ignoring unsupported binary frame"
                );
            }
            WsMessage::Close(_) => break,
            WsMessage::Ping(_) | WsMessage::Pong(_) => {}
        }
    }

    // Disconnect is terminal: drop every subscription, then stop the pump.
    state.registry.leave_all(&connection_id).await;
    send_task.abort();
    tracing::info!(
        connection_id = %connection_id,
        user_id = %identity.user_id,
        "Connection closed"
    );
}

/// Single dispatch point for every decoded client frame.
async fn dispatch(
    frame: ClientFrame,
    identity: &Identity,
    connection_id: ConnectionId,
    tx: &FrameSender,
    state: &GatewayState,
) {
    match frame {
        ClientFrame::JoinRoom { room_id } => {
            join_room(room_id, identity, connection_id, tx, state).await;
        }
        ClientFrame::SendMessage {
            room_id,
            content,
            msg_type,
            client_tag,
        } => {
            send_message(room_id, content, msg_type, client_tag, identity, tx, state).await;
        }
        ClientFrame::Typing { room_id, is_typing } => {
            typing(room_id, is_typing, identity, connection_id, state).await;
        }
    }
}

async fn join_room(
    room_id: String,
    identity: &Identity,
    connection_id: ConnectionId,
    tx: &FrameSender,
    state: &GatewayState,
) {
    let room_id = match RoomId::parse(room_id) {
        Ok(room_id) => room_id,
        Err(err) => {
            let _ = tx.send(ServerFrame::error(err.to_string())).await;
            return;
        }
    };

    let command = JoinRoomCommand {
        room_id: room_id.clone(),
        user_id: identity.user_id.clone(),
        backlog_limit: state.backlog_limit,
    };

    match state.join_room.handle(command).await {
        Ok(backlog) => {
            // Subscribe before replying so no event published after the
            // backlog read can slip past this connection.
            state.registry.join(&room_id, connection_id, tx.clone()).await;

            let messages = backlog
                .iter()
                .map(|m| MessagePayload::from_message(m, None))
                .collect();
            let _ = tx.send(ServerFrame::RoomJoined { room_id, messages }).await;
        }
        Err(err) => {
            tracing::debug!(user_id = %identity.user_id, "Join rejected: {}", err);
            let _ = tx.send(ServerFrame::error(err.to_string())).await;
        }
    }
}

async fn send_message(
    room_id: String,
    content: String,
    msg_type: String,
    client_tag: Option<String>,
    identity: &Identity,
    tx: &FrameSender,
    state: &GatewayState,
) {
    let parsed = RoomId::parse(room_id).and_then(|room_id| {
        msg_type
            .parse()
            .map(|kind| (room_id, kind))
    });
    let (room_id, kind) = match parsed {
        Ok(parts) => parts,
        Err(err) => {
            let _ = tx.send(ServerFrame::error(err.to_string())).await;
            return;
        }
    };

    let command = SendMessageCommand {
        room_id,
        sender: identity.clone(),
        content,
        kind,
        client_tag: client_tag.clone(),
    };

    match state.send_message.handle(command).await {
        Ok(message) => {
            // Immediate local echo; the durable event follows and the
            // client joins the two on clientTag (or id).
            let payload = MessagePayload::from_message(&message, client_tag);
            let _ = tx.send(ServerFrame::Message(payload)).await;
        }
        Err(err) => {
            tracing::debug!(user_id = %identity.user_id, "Send rejected: {}", err);
            let _ = tx.send(ServerFrame::error(err.to_string())).await;
        }
    }
}

async fn typing(
    room_id: String,
    is_typing: bool,
    identity: &Identity,
    connection_id: ConnectionId,
    state: &GatewayState,
) {
    // Fire-and-forget: malformed room ids are dropped without a reply.
    let Ok(room_id) = RoomId::parse(room_id) else {
        return;
    };

    let frame = ServerFrame::Typing {
        room_id: room_id.clone(),
        is_typing,
        user_id: identity.user_id.clone(),
        user_name: identity.name.clone(),
    };
    state
        .registry
        .broadcast(&room_id, &frame, Some(&connection_id))
        .await;

    let broadcast = BroadcastFrame::typing(
        state.instance,
        room_id,
        identity.user_id.clone(),
        identity.name.clone(),
        is_typing,
    );
    if let Err(err) = state.broadcast.publish(&broadcast).await {
        tracing::debug!("Typing broadcast dropped: {}", err);
    }
}

/// Router for the realtime endpoint.
pub fn gateway_router() -> Router<GatewayState> {
    Router::new().route("/ws", get(ws_handler))
}
