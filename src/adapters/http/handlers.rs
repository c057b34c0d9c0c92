//! Handlers for the HTTP surface.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::time::timeout;

use crate::application::{
    BacklogQuery, CreateRoomCommand, CreateRoomHandler, FetchBacklogHandler, SendMessageCommand,
    SendMessageHandler,
};
use crate::domain::{ChatError, Identity, MessageKind, RoomId, Timestamp, UserId};
use crate::ports::{IdentityValidator, MediaStorage, RoomDirectory};

use super::dto::{
    CreateRoomRequest, CreateRoomResponse, ErrorResponse, MessageDto, MessagesResponse, RoomDto,
    RoomsResponse,
};

/// Shared state for the HTTP surface, cloned per request.
#[derive(Clone)]
pub struct HttpAppState {
    pub identity: Arc<dyn IdentityValidator>,
    pub media: Arc<dyn MediaStorage>,
    pub directory: Arc<dyn RoomDirectory>,
    pub create_room: CreateRoomHandler,
    pub backlog: FetchBacklogHandler,
    pub send_message: SendMessageHandler,
    pub auth_timeout: Duration,
}

// ════════════════════════════════════════════════════════════════════════════
// Error mapping
// ════════════════════════════════════════════════════════════════════════════

/// Wraps [`ChatError`] for the HTTP boundary.
#[derive(Debug)]
pub struct ApiError(pub ChatError);

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ChatError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ChatError::Authorization(_) => StatusCode::FORBIDDEN,
            ChatError::Validation(_) => StatusCode::BAD_REQUEST,
            ChatError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ChatError::Transport(_) => StatusCode::BAD_GATEWAY,
        };
        let body = ErrorResponse::new(self.0.code(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Authentication extractor
// ════════════════════════════════════════════════════════════════════════════

/// Identity extracted from the `Authorization: Bearer` header, validated
/// against the identity collaborator with a bounded timeout.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl axum::extract::FromRequestParts<HttpAppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpAppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError(ChatError::authentication("No token provided")))?;

        let identity = timeout(state.auth_timeout, state.identity.validate(token))
            .await
            .map_err(|_| ApiError(ChatError::authentication("Authentication timeout")))?
            .map_err(ApiError)?;

        Ok(CurrentUser(identity))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    limit: Option<u32>,
    before: Option<DateTime<Utc>>,
}

/// GET /chats/{roomId}?limit&before - one page of backlog, newest first.
async fn get_messages(
    State(state): State<HttpAppState>,
    CurrentUser(identity): CurrentUser,
    Path(room_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let room_id = RoomId::parse(room_id)?;

    let messages = state
        .backlog
        .handle(BacklogQuery {
            room_id,
            user_id: identity.user_id,
            limit: page.limit,
            before: page.before.map(Timestamp::from_datetime),
        })
        .await?;

    Ok(Json(MessagesResponse {
        messages: messages.iter().map(MessageDto::from).collect(),
    }))
}

/// POST /chats/room - create (or look up) a room for a participant set.
async fn create_room(
    State(state): State<HttpAppState>,
    CurrentUser(identity): CurrentUser,
    Json(request): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let participants = request
        .participants
        .into_iter()
        .map(UserId::new)
        .collect::<Result<Vec<_>, _>>()?;

    let room_id = state
        .create_room
        .handle(CreateRoomCommand {
            participants,
            created_by: identity.user_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateRoomResponse {
            room_id: room_id.to_string(),
        }),
    ))
}

/// GET /chats/rooms/mine - rooms the caller participates in.
async fn my_rooms(
    State(state): State<HttpAppState>,
    CurrentUser(identity): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let rooms = state.directory.rooms_for_user(&identity.user_id).await?;
    Ok(Json(RoomsResponse {
        rooms: rooms.iter().map(RoomDto::from).collect(),
    }))
}

/// Accumulated multipart fields for a send.
#[derive(Default)]
struct SendForm {
    room_id: Option<String>,
    content: Option<String>,
    msg_type: Option<String>,
    client_tag: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

async fn read_send_form(mut multipart: Multipart) -> Result<SendForm, ApiError> {
    let mut form = SendForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError(ChatError::validation(format!("Malformed multipart body: {}", e))))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "roomId" => form.room_id = Some(read_text(field).await?),
            "content" => form.content = Some(read_text(field).await?),
            "type" => form.msg_type = Some(read_text(field).await?),
            "clientTag" => form.client_tag = Some(read_text(field).await?),
            "file" => {
                let filename = field
                    .file_name()
                    .unwrap_or("upload.bin")
                    .to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError(ChatError::validation(format!("Unreadable file part: {}", e)))
                })?;
                form.file = Some((filename, bytes.to_vec()));
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }
    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError(ChatError::validation(format!("Unreadable form field: {}", e))))
}

/// POST /chats/send - multipart send; `image`/`file` payloads are
/// uploaded to the media collaborator first and the URL becomes the
/// content.
async fn send_message(
    State(state): State<HttpAppState>,
    CurrentUser(identity): CurrentUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_send_form(multipart).await?;

    let room_id = RoomId::parse(
        form.room_id
            .ok_or_else(|| ApiError(ChatError::validation("Missing roomId")))?,
    )?;
    let kind: MessageKind = form
        .msg_type
        .ok_or_else(|| ApiError(ChatError::validation("Missing message type")))?
        .parse()?;

    let content = match (kind.is_media(), form.file) {
        (true, Some((filename, bytes))) => state.media.upload(&filename, bytes).await?,
        _ => form
            .content
            .ok_or_else(|| ApiError(ChatError::validation("Missing content")))?,
    };

    let message = state
        .send_message
        .handle(SendMessageCommand {
            room_id,
            sender: identity,
            content,
            kind,
            client_tag: form.client_tag.clone(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageDto::from_message(&message, form.client_tag)),
    ))
}

/// GET /health - liveness probe; no authentication.
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Router for the HTTP surface.
pub fn chat_router() -> Router<HttpAppState> {
    Router::new()
        .route("/chats/rooms/mine", get(my_rooms))
        .route("/chats/room", post(create_room))
        .route("/chats/send", post(send_message))
        .route("/chats/{room_id}", get(get_messages))
        .route("/health", get(health))
}
