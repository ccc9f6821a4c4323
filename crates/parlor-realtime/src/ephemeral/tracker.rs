//! Ephemeral signal tracker.
//!
//! Each (conversation, user, kind) key is either absent or active. An
//! active entry owns exactly one [`ExpiryTimer`]; a repeated start swaps
//! the entry, and dropping the old entry cancels its timer. Expiry removes
//! the entry only if the generation that armed the timer is still current,
//! so a timer that lost a race with a refresh or stop is a no-op.
//!
//! Mutation and relay for one key happen under that key's gate, so
//! recipients see a key's starts and stops in the order they were applied.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use parlor_core::config::RealtimeConfig;
use parlor_core::timer::ExpiryTimer;
use parlor_core::types::{ConversationId, UserId};

use super::signal::{Signal, SignalKind, SignalRelay, SignalTransition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SignalKey {
    conversation_id: ConversationId,
    user_id: UserId,
    kind: SignalKind,
}

impl SignalKey {
    fn into_signal(self, display_name: String) -> Signal {
        Signal {
            conversation_id: self.conversation_id,
            user_id: self.user_id,
            display_name,
            kind: self.kind,
        }
    }
}

#[derive(Debug)]
struct SignalEntry {
    generation: u64,
    display_name: String,
    _timer: ExpiryTimer,
}

/// Holds every active typing/thinking signal.
pub struct EphemeralTracker {
    entries: DashMap<SignalKey, SignalEntry>,
    gates: DashMap<SignalKey, Arc<Mutex<()>>>,
    generation: AtomicU64,
    relay: Arc<dyn SignalRelay>,
    typing_ttl: Duration,
    thinking_ttl: Duration,
    this: Weak<Self>,
}

impl std::fmt::Debug for EphemeralTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralTracker")
            .field("active", &self.entries.len())
            .finish()
    }
}

impl EphemeralTracker {
    /// Creates a tracker that relays through `relay`.
    pub fn new(config: &RealtimeConfig, relay: Arc<dyn SignalRelay>) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            entries: DashMap::new(),
            gates: DashMap::new(),
            generation: AtomicU64::new(0),
            relay,
            typing_ttl: config.typing_ttl(),
            thinking_ttl: config.thinking_ttl(),
            this: this.clone(),
        })
    }

    fn ttl(&self, kind: SignalKind) -> Duration {
        match kind {
            SignalKind::Typing => self.typing_ttl,
            SignalKind::Thinking => self.thinking_ttl,
        }
    }

    fn gate(&self, key: SignalKey) -> Arc<Mutex<()>> {
        self.gates.entry(key).or_default().clone()
    }

    /// Drops the key's gate once nothing is waiting on it and the key is
    /// no longer active.
    fn release(&self, key: SignalKey) {
        self.gates.remove_if(&key, |_, gate| {
            Arc::strong_count(gate) == 1 && !self.entries.contains_key(&key)
        });
    }

    /// Activates or refreshes a signal and relays it.
    pub async fn start(&self, signal: Signal) -> SignalTransition {
        let key = SignalKey {
            conversation_id: signal.conversation_id,
            user_id: signal.user_id,
            kind: signal.kind,
        };
        let gate = self.gate(key);
        let guard = gate.lock().await;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let tracker = self.this.clone();
        let timer = ExpiryTimer::start(self.ttl(signal.kind), async move {
            if let Some(tracker) = tracker.upgrade() {
                tracker.expire(key, generation).await;
            }
        });

        let previous = self.entries.insert(
            key,
            SignalEntry {
                generation,
                display_name: signal.display_name.clone(),
                _timer: timer,
            },
        );
        let transition = match previous {
            Some(_) => SignalTransition::Refreshed,
            None => SignalTransition::Started,
        };
        drop(previous);

        debug!(
            conversation_id = %key.conversation_id,
            user_id = %key.user_id,
            kind = key.kind.as_str(),
            ?transition,
            "Signal started"
        );
        self.relay.relay(&signal, true).await;

        drop(guard);
        drop(gate);
        self.release(key);
        transition
    }

    /// Deactivates a signal. Relays only if it was active.
    pub async fn stop(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        kind: SignalKind,
    ) -> bool {
        let key = SignalKey {
            conversation_id,
            user_id,
            kind,
        };
        let gate = self.gate(key);
        let guard = gate.lock().await;

        let stopped = match self.entries.remove(&key) {
            Some((key, entry)) => {
                self.relay
                    .relay(&key.into_signal(entry.display_name.clone()), false)
                    .await;
                true
            }
            None => false,
        };

        drop(guard);
        drop(gate);
        self.release(key);
        stopped
    }

    async fn expire(&self, key: SignalKey, generation: u64) {
        let gate = self.gate(key);
        let guard = gate.lock().await;

        if let Some((key, entry)) = self
            .entries
            .remove_if(&key, |_, entry| entry.generation == generation)
        {
            debug!(
                conversation_id = %key.conversation_id,
                user_id = %key.user_id,
                kind = key.kind.as_str(),
                "Signal expired"
            );
            self.relay
                .relay(&key.into_signal(entry.display_name.clone()), false)
                .await;
        }

        drop(guard);
        drop(gate);
        self.release(key);
    }

    /// Stops every signal held by `user_id`, relaying each stop.
    pub async fn clear_user(&self, user_id: UserId) -> usize {
        let keys: Vec<SignalKey> = self
            .entries
            .iter()
            .filter(|entry| entry.key().user_id == user_id)
            .map(|entry| *entry.key())
            .collect();

        let mut cleared = 0;
        for key in keys {
            if self.stop(key.conversation_id, key.user_id, key.kind).await {
                cleared += 1;
            }
        }
        cleared
    }

    /// Drops every signal without relaying.
    pub fn clear_all(&self) {
        self.entries.clear();
        self.gates.clear();
    }

    /// Whether a signal is currently active.
    pub fn is_active(
        &self,
        conversation_id: ConversationId,
        user_id: UserId,
        kind: SignalKind,
    ) -> bool {
        self.entries.contains_key(&SignalKey {
            conversation_id,
            user_id,
            kind,
        })
    }

    /// Number of active signals.
    pub fn active_count(&self) -> usize {
        self.entries.len()
    }
}
