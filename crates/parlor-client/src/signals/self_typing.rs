//! Suppression of the user's own typing signal.
//!
//! Keystrokes call [`SelfTyping::notify`] freely; only the first one in a
//! burst produces `typing:true`, and a `typing:false` follows once the
//! user has been idle for the configured time.

use std::future::Future;
use std::time::Duration;

use parlor_core::timer::ExpiryTimer;
use parlor_core::types::ConversationId;

#[derive(Debug)]
struct Active {
    conversation_id: ConversationId,
    generation: u64,
    _idle: ExpiryTimer,
}

/// Which typing frames the caller must send, in order.
pub type TypingFrames = Vec<(ConversationId, bool)>;

/// At most one conversation carries the user's typing signal at a time.
#[derive(Debug, Default)]
pub struct SelfTyping {
    active: Option<Active>,
    next_generation: u64,
}

impl SelfTyping {
    /// Records typing activity and re-arms the idle timer.
    pub fn notify<F>(
        &mut self,
        conversation_id: ConversationId,
        idle_after: Duration,
        on_idle: impl FnOnce(u64) -> F,
    ) -> TypingFrames
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut frames = Vec::new();
        match self.active.take() {
            Some(active) if active.conversation_id == conversation_id => {}
            Some(active) => {
                frames.push((active.conversation_id, false));
                frames.push((conversation_id, true));
            }
            None => frames.push((conversation_id, true)),
        }

        self.next_generation += 1;
        let generation = self.next_generation;
        self.active = Some(Active {
            conversation_id,
            generation,
            _idle: ExpiryTimer::start(idle_after, on_idle(generation)),
        });
        frames
    }

    /// Idle-timer callback. Returns the conversation to send `typing:false`
    /// to, unless activity re-armed the timer in the meantime.
    pub fn idle(&mut self, generation: u64) -> Option<ConversationId> {
        if self.active.as_ref().is_some_and(|active| active.generation == generation) {
            return self.active.take().map(|active| active.conversation_id);
        }
        None
    }

    /// Ends the signal now. Returns the conversation to send
    /// `typing:false` to, if one was active.
    pub fn reset(&mut self) -> Option<ConversationId> {
        self.active.take().map(|active| active.conversation_id)
    }

    /// Forgets the signal without sending anything; the server has no
    /// record of it either.
    pub fn clear(&mut self) {
        self.active = None;
    }

    /// The conversation currently carrying the signal.
    pub fn conversation(&self) -> Option<ConversationId> {
        self.active.as_ref().map(|active| active.conversation_id)
    }
}
