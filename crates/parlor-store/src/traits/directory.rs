//! User directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use parlor_core::result::AppResult;
use parlor_core::types::UserId;
use parlor_entity::{PresenceStatus, UserProfile};

/// Account lookup and presence persistence.
#[async_trait]
pub trait UserDirectory: Send + Sync + 'static {
    /// Finds a user by ID.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserProfile>>;

    /// Persists a presence status and returns the updated profile.
    ///
    /// `last_seen_at` of `None` leaves the stored value untouched.
    async fn set_presence(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> AppResult<UserProfile>;
}
