//! Presence tracker: derives online/offline from connection-set
//! transitions and keeps the user's explicit sticky status.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use parlor_core::result::AppResult;
use parlor_core::types::UserId;
use parlor_entity::{PresenceStatus, UserProfile};
use parlor_store::ChatStore;

use crate::connection::registry::ConnectionRegistry;
use crate::dispatch::dispatcher::EventDispatcher;

/// Per-user presence record. Never removed.
#[derive(Debug, Default)]
struct PresenceEntry {
    /// Serializes persist-and-broadcast for one user.
    gate: Arc<Mutex<()>>,
    /// Explicit idle/away/dnd choice that survives reconnects.
    sticky: Option<PresenceStatus>,
}

/// Tracks presence state for all users.
///
/// Connection transitions do not carry the status they imply. Each one
/// takes the user's gate and derives the status from the registry as it is
/// at that moment, so when a disconnect and a reconnect race, whichever
/// write lands last still matches the real connection set.
pub struct PresenceTracker {
    registry: Arc<ConnectionRegistry>,
    store: Arc<dyn ChatStore>,
    dispatcher: Arc<EventDispatcher>,
    entries: DashMap<UserId, PresenceEntry>,
}

impl std::fmt::Debug for PresenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceTracker")
            .field("tracked", &self.entries.len())
            .finish()
    }
}

impl PresenceTracker {
    /// Creates a new presence tracker.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        store: Arc<dyn ChatStore>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            registry,
            store,
            dispatcher,
            entries: DashMap::new(),
        }
    }

    fn gate(&self, user_id: UserId) -> Arc<Mutex<()>> {
        self.entries.entry(user_id).or_default().gate.clone()
    }

    /// The user's sticky status, if one is recorded.
    pub fn sticky_status(&self, user_id: UserId) -> Option<PresenceStatus> {
        self.entries.get(&user_id).and_then(|entry| entry.sticky)
    }

    /// Called when the user's connection set went from empty to non-empty.
    pub async fn connection_opened(&self, user_id: UserId) -> AppResult<UserProfile> {
        self.settle(user_id).await
    }

    /// Called when the user's connection set became empty.
    pub async fn connection_closed(&self, user_id: UserId) -> AppResult<UserProfile> {
        self.settle(user_id).await
    }

    async fn settle(&self, user_id: UserId) -> AppResult<UserProfile> {
        let gate = self.gate(user_id);
        let _guard = gate.lock().await;

        let (status, last_seen_at) = if self.registry.is_connected(user_id) {
            let sticky = match self.sticky_status(user_id) {
                Some(status) => Some(status),
                None => self
                    .store
                    .find_user(user_id)
                    .await?
                    .map(|user| user.presence_status)
                    .filter(PresenceStatus::is_sticky),
            };
            (sticky.unwrap_or(PresenceStatus::Online), None)
        } else {
            (PresenceStatus::Offline, Some(Utc::now()))
        };

        let profile = self.store.set_presence(user_id, status, last_seen_at).await?;
        self.dispatcher.presence_updated(&profile);
        info!(user_id = %user_id, status = status.as_str(), "Presence updated");
        Ok(profile)
    }

    /// Applies an explicit status chosen by the user.
    ///
    /// Idle, away and dnd become sticky; online and offline clear any
    /// sticky choice. Persisted and broadcast regardless of how many
    /// connections the user has.
    pub async fn set_status(&self, user_id: UserId, status: PresenceStatus) -> AppResult<UserProfile> {
        let gate = self.gate(user_id);
        let _guard = gate.lock().await;

        let last_seen_at = (status == PresenceStatus::Offline).then(Utc::now);
        let profile = self.store.set_presence(user_id, status, last_seen_at).await?;

        if let Some(mut entry) = self.entries.get_mut(&user_id) {
            entry.sticky = status.is_sticky().then_some(status);
        }

        self.dispatcher.presence_updated(&profile);
        info!(user_id = %user_id, status = status.as_str(), "Presence set explicitly");
        Ok(profile)
    }
}
