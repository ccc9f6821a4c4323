//! Live-channel authentication: validates the bearer token from the
//! connection URI and checks that the account may connect.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error};

use parlor_auth::JwtDecoder;
use parlor_entity::UserProfile;
use parlor_store::ChatStore;

/// Close code sent when a handshake is rejected.
pub const HANDSHAKE_REJECTED: u16 = 4001;

/// A rejected handshake: the channel is closed with `code` and `reason`
/// and nothing is registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("handshake rejected ({code}): {reason}")]
pub struct HandshakeError {
    /// Close code.
    pub code: u16,
    /// Human-readable close reason.
    pub reason: String,
}

impl HandshakeError {
    fn rejected(reason: &str) -> Self {
        Self {
            code: HANDSHAKE_REJECTED,
            reason: reason.to_string(),
        }
    }
}

/// Authenticates live connections using JWT access tokens.
#[derive(Clone)]
pub struct WsAuthenticator {
    decoder: Arc<JwtDecoder>,
    store: Arc<dyn ChatStore>,
}

impl std::fmt::Debug for WsAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsAuthenticator").finish()
    }
}

impl WsAuthenticator {
    /// Creates a new authenticator.
    pub fn new(decoder: Arc<JwtDecoder>, store: Arc<dyn ChatStore>) -> Self {
        Self { decoder, store }
    }

    /// Verifies the token and loads the account it names.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<UserProfile, HandshakeError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| HandshakeError::rejected("Missing token"))?;

        let claims = self.decoder.decode_access_token(token).map_err(|e| {
            debug!(error = %e, "Rejected live-channel token");
            HandshakeError::rejected("Invalid token")
        })?;

        match self.store.find_user(claims.user_id()).await {
            Ok(Some(user)) if user.status.can_connect() => Ok(user),
            Ok(Some(user)) => {
                debug!(user_id = %user.id, status = user.status.as_str(), "Account may not connect");
                Err(HandshakeError::rejected("Account not available"))
            }
            Ok(None) => Err(HandshakeError::rejected("Account not available")),
            Err(e) => {
                error!(user_id = %claims.user_id(), error = %e, "Account lookup failed during handshake");
                Err(HandshakeError::rejected("Account not available"))
            }
        }
    }
}
