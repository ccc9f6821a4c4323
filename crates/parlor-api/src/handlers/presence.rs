//! Explicit presence changes.

use axum::Json;
use axum::extract::State;

use crate::dto::request::PresenceRequest;
use crate::dto::response::UserResponse;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// PUT /api/users/me/presence
pub async fn set_presence(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PresenceRequest>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.engine.presence.set_status(auth.id, req.status).await?;
    Ok(Json(UserResponse { user }))
}
