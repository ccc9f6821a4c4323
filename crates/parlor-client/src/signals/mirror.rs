//! Expiring indicators for other members' signals.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use parlor_core::timer::ExpiryTimer;
use parlor_core::types::{ConversationId, UserId};

/// Which indicator a signal feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Typing,
    Thinking,
}

impl IndicatorKind {
    fn verb(self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::Thinking => "thinking",
        }
    }
}

/// Identity of one mirrored signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SignalKey {
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub kind: IndicatorKind,
}

#[derive(Debug)]
struct MirrorEntry {
    key: SignalKey,
    display_name: String,
    generation: u64,
    _timer: ExpiryTimer,
}

/// Active indicators in the order they (re)started. Each entry owns its
/// expiry timer; replacing or removing an entry cancels it.
#[derive(Debug, Default)]
pub struct SignalMirror {
    entries: Vec<MirrorEntry>,
    next_generation: u64,
}

impl SignalMirror {
    /// Starts or refreshes an indicator. `on_expire` receives the entry's
    /// generation and should route it back to [`expire`](Self::expire).
    pub fn start<F>(
        &mut self,
        key: SignalKey,
        display_name: &str,
        ttl: Duration,
        on_expire: impl FnOnce(u64) -> F,
    ) where
        F: Future<Output = ()> + Send + 'static,
    {
        self.stop(key);
        self.next_generation += 1;
        let generation = self.next_generation;
        let display_name = if display_name.trim().is_empty() {
            "Someone".to_string()
        } else {
            display_name.to_string()
        };
        self.entries.push(MirrorEntry {
            key,
            display_name,
            generation,
            _timer: ExpiryTimer::start(ttl, on_expire(generation)),
        });
    }

    /// Removes an indicator. Returns whether it was active.
    pub fn stop(&mut self, key: SignalKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.key != key);
        self.entries.len() != before
    }

    /// Timer callback. A stale generation means the entry was refreshed or
    /// stopped after this timer was armed, so nothing happens.
    pub fn expire(&mut self, key: SignalKey, generation: u64) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !(entry.key == key && entry.generation == generation));
        self.entries.len() != before
    }

    /// Drops every indicator and its timer.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Display names of active signals of one kind in a conversation.
    pub fn names(&self, conversation_id: ConversationId, kind: IndicatorKind) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.key.conversation_id == conversation_id && entry.key.kind == kind)
            .map(|entry| entry.display_name.as_str())
            .collect()
    }

    /// Indicator line for a conversation, e.g. "Ada and Bo are typing…".
    pub fn summary(&self, conversation_id: ConversationId, kind: IndicatorKind) -> Option<String> {
        summarize(&self.names(conversation_id, kind), kind)
    }

    /// Number of active indicators across all conversations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no indicator is active.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Up to three names, then "and N other(s)"; "is" only for a lone name.
pub fn summarize(names: &[&str], kind: IndicatorKind) -> Option<String> {
    if names.is_empty() {
        return None;
    }
    let shown = &names[..names.len().min(3)];
    let remaining = names.len() - shown.len();

    let mut summary = shown.join(", ");
    if remaining > 0 {
        let plural = if remaining > 1 { "s" } else { "" };
        summary.push_str(&format!(" and {remaining} other{plural}"));
    }
    let verb = if remaining > 0 || shown.len() > 1 { "are" } else { "is" };
    Some(format!("{summary} {verb} {}…", kind.verb()))
}
