//! Client channel lifecycle configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the client-side reconnector and signal mirror.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Delay before a reconnect attempt after an unexpected close.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Idle time after which the client's own typing signal is withdrawn.
    #[serde(default = "default_self_typing_ttl")]
    pub self_typing_ttl_ms: u64,
    /// Lifetime of a mirrored "typing" indicator.
    #[serde(default = "default_typing_ttl")]
    pub typing_ttl_ms: u64,
    /// Lifetime of a mirrored "thinking" indicator.
    #[serde(default = "default_thinking_ttl")]
    pub thinking_ttl_ms: u64,
}

impl ClientConfig {
    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Self-typing idle timeout as a [`Duration`].
    pub fn self_typing_ttl(&self) -> Duration {
        Duration::from_millis(self.self_typing_ttl_ms)
    }

    /// Typing indicator TTL as a [`Duration`].
    pub fn typing_ttl(&self) -> Duration {
        Duration::from_millis(self.typing_ttl_ms)
    }

    /// Thinking indicator TTL as a [`Duration`].
    pub fn thinking_ttl(&self) -> Duration {
        Duration::from_millis(self.thinking_ttl_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay(),
            self_typing_ttl_ms: default_self_typing_ttl(),
            typing_ttl_ms: default_typing_ttl(),
            thinking_ttl_ms: default_thinking_ttl(),
        }
    }
}

fn default_reconnect_delay() -> u64 {
    1_500
}

fn default_self_typing_ttl() -> u64 {
    4_000
}

fn default_typing_ttl() -> u64 {
    4_000
}

fn default_thinking_ttl() -> u64 {
    8_000
}
