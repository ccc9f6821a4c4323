//! Bearer-token configuration.

use serde::{Deserialize, Serialize};

/// Settings for verifying (and, in tests and tooling, issuing) bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify tokens.
    #[serde(default = "default_secret")]
    pub jwt_secret: String,
    /// Expected `iss` claim.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_seconds: i64,
    /// Clock skew tolerated on `exp`, in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

impl AuthConfig {
    /// Whether the signing secret is the insecure development fallback.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == default_secret()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_secret(),
            issuer: default_issuer(),
            access_token_ttl_seconds: default_access_ttl(),
            leeway_seconds: default_leeway(),
        }
    }
}

fn default_secret() -> String {
    "local-dev-secret".to_string()
}

fn default_issuer() -> String {
    "parlor".to_string()
}

fn default_access_ttl() -> i64 {
    12 * 60 * 60
}

fn default_leeway() -> u64 {
    5
}
