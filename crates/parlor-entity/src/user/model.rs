//! User profile model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parlor_core::types::UserId;

use super::status::AccountStatus;
use crate::presence::PresenceStatus;

/// The public profile of a user, as sent in `ready` and `presence:updated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Unique user identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Human-readable display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Account status.
    pub status: AccountStatus,
    /// Whether this account is an automated agent.
    #[serde(default)]
    pub bot: bool,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Current presence.
    #[serde(default)]
    pub presence_status: PresenceStatus,
    /// When the user last dropped their final connection.
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Creates an active, offline profile.
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            display_name: None,
            status: AccountStatus::Active,
            bot: false,
            avatar_url: None,
            presence_status: PresenceStatus::Offline,
            last_seen_at: None,
        }
    }

    /// Display name, falling back to the username.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.username)
    }
}
