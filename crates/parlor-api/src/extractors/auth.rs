//! `AuthUser` extractor: pulls the JWT from the Authorization header,
//! validates it, and loads the account it names.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use parlor_core::error::AppError;
use parlor_entity::UserProfile;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserProfile);

impl std::ops::Deref for AuthUser {
    type Target = UserProfile;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::authentication("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::authentication("Invalid Authorization header format"))?;

        let claims = state
            .jwt_decoder
            .decode_access_token(token)
            .map_err(|_| AppError::authentication("Invalid token"))?;

        let user = state
            .store
            .find_user(claims.user_id())
            .await?
            .filter(|user| user.status.can_connect())
            .ok_or_else(|| AppError::authentication("Account not available"))?;

        Ok(AuthUser(user))
    }
}
