//! Real-time channel engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Real-time (live channel) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound queue depth per connection.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Lifetime of a "typing" signal without refresh, in milliseconds.
    #[serde(default = "default_typing_ttl")]
    pub typing_ttl_ms: u64,
    /// Lifetime of a "thinking" signal without refresh, in milliseconds.
    #[serde(default = "default_thinking_ttl")]
    pub thinking_ttl_ms: u64,
    /// Stored message content is truncated to this many characters.
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    /// Inbound frames larger than this are rejected.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

impl RealtimeConfig {
    /// Typing TTL as a [`Duration`].
    pub fn typing_ttl(&self) -> Duration {
        Duration::from_millis(self.typing_ttl_ms)
    }

    /// Thinking TTL as a [`Duration`].
    pub fn thinking_ttl(&self) -> Duration {
        Duration::from_millis(self.thinking_ttl_ms)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            channel_buffer_size: default_channel_buffer(),
            typing_ttl_ms: default_typing_ttl(),
            thinking_ttl_ms: default_thinking_ttl(),
            max_message_chars: default_max_message_chars(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

fn default_channel_buffer() -> usize {
    256
}

fn default_typing_ttl() -> u64 {
    4_000
}

fn default_thinking_ttl() -> u64 {
    8_000
}

fn default_max_message_chars() -> usize {
    2_000
}

fn default_max_frame_bytes() -> usize {
    65_536
}
