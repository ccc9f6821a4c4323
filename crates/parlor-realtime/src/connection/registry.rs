//! Connection registry: every open live connection, indexed by user.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use parlor_core::types::{ConnectionId, UserId};

use super::handle::ConnectionHandle;

/// Thread-safe registry of live connections.
///
/// The per-user set is mutated under its map-entry lock, so the
/// "first connection" / "last connection" answers returned by
/// [`register`](Self::register) and [`unregister`](Self::unregister) are
/// computed atomically with the mutation that caused them.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// User ID → that user's open connections (multi-device).
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
    /// Connection ID → handle for direct lookup.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to its user's set, creating the set if absent.
    ///
    /// Returns `true` when the set went from empty to non-empty.
    pub fn register(&self, handle: Arc<ConnectionHandle>) -> bool {
        self.by_id.insert(handle.id, handle.clone());
        let mut set = self.by_user.entry(handle.user_id).or_default();
        let first = set.is_empty();
        set.push(handle);
        first
    }

    /// Removes a connection.
    ///
    /// Returns `true` only when this removal emptied the user's set. That
    /// answer is the sole trigger for an offline transition. Removing an
    /// unknown connection returns `false`.
    pub fn unregister(&self, user_id: UserId, conn_id: ConnectionId) -> bool {
        self.by_id.remove(&conn_id);
        match self.by_user.entry(user_id) {
            Entry::Occupied(mut entry) => {
                let before = entry.get().len();
                entry.get_mut().retain(|c| c.id != conn_id);
                let removed = entry.get().len() < before;
                if removed && entry.get().is_empty() {
                    entry.remove();
                    return true;
                }
                false
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Delivers a payload to every connection of a user.
    ///
    /// A user with no connections is a silent no-op. A dead channel does not
    /// stop delivery to the user's remaining channels. Returns the number of
    /// channels that accepted the payload.
    pub fn send_to_user(&self, user_id: UserId, payload: &str) -> usize {
        let connections = self.user_connections(user_id);
        deliver(&connections, payload)
    }

    /// Delivers a payload to every registered connection.
    pub fn broadcast_all(&self, payload: &str) -> usize {
        deliver(&self.all_connections(), payload)
    }

    /// Snapshot of a user's open connections.
    pub fn user_connections(&self, user_id: UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Whether the user currently has at least one open connection.
    pub fn is_connected(&self, user_id: UserId) -> bool {
        self.by_user.contains_key(&user_id)
    }

    /// Returns total number of open connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

fn deliver(connections: &[Arc<ConnectionHandle>], payload: &str) -> usize {
    let mut delivered = 0;
    for conn in connections {
        if conn.send(payload.to_string()) {
            delivered += 1;
        } else {
            debug!(conn_id = %conn.id, user_id = %conn.user_id, "Skipped undeliverable connection");
        }
    }
    delivered
}
