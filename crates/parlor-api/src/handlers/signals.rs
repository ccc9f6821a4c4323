//! Agent thinking signals and read receipts.

use axum::Json;
use axum::extract::{Path, State};

use parlor_core::types::ConversationId;

use crate::dto::request::{ReadRequest, ThinkingRequest};
use crate::dto::response::{OkResponse, ReceiptResponse};
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/conversations/{id}/thinking
pub async fn set_thinking(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(conversation_id): Path<ConversationId>,
    Json(req): Json<ThinkingRequest>,
) -> ApiResult<Json<OkResponse>> {
    state
        .engine
        .chat
        .agent_thinking(auth.id, auth.label(), conversation_id, req.thinking)
        .await?;
    Ok(Json(OkResponse { ok: true }))
}

/// POST /api/conversations/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(conversation_id): Path<ConversationId>,
    Json(req): Json<ReadRequest>,
) -> ApiResult<Json<ReceiptResponse>> {
    let receipt = state
        .engine
        .chat
        .mark_read(auth.id, conversation_id, req.message_id)
        .await?;
    Ok(Json(ReceiptResponse { receipt }))
}
