//! JWT token generation.

use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use parlor_core::config::AuthConfig;
use parlor_core::error::AppError;
use parlor_core::types::UserId;

use super::claims::Claims;

/// Issues signed access tokens.
#[derive(Clone)]
pub struct JwtEncoder {
    /// HMAC secret key.
    encoding_key: EncodingKey,
    /// Issuer written into every token.
    issuer: String,
    /// Access token lifetime in seconds.
    access_ttl_seconds: i64,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("issuer", &self.issuer)
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            access_ttl_seconds: config.access_token_ttl_seconds,
        }
    }

    /// Issues an access token for a user.
    pub fn issue(&self, user_id: UserId, username: &str) -> Result<String, AppError> {
        self.issue_with_ttl(user_id, username, self.access_ttl_seconds)
    }

    /// Issues an access token with an explicit lifetime (negative values
    /// produce an already-expired token).
    pub fn issue_with_ttl(
        &self,
        user_id: UserId,
        username: &str,
        ttl_seconds: i64,
    ) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now + ttl_seconds,
            jti: Uuid::new_v4(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }
}
