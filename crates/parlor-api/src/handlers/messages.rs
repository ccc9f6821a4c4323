//! Message submission over HTTP.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use validator::Validate;

use parlor_core::types::ConversationId;

use crate::dto::request::SendMessageRequest;
use crate::dto::response::MessageResponse;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/conversations/{id}/messages
///
/// Responds only after the message was stored and `message:created` was
/// handed to every member's connections.
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(conversation_id): Path<ConversationId>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    req.validate()?;

    let message = state
        .engine
        .chat
        .send_message(
            auth.id,
            conversation_id,
            &req.content,
            req.format.unwrap_or_default(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(MessageResponse { message })))
}
