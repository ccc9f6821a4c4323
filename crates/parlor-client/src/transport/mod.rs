//! Pluggable transports for the live channel and message submission.

pub mod http;
pub mod ws;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Error type for transport operations.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The channel could not be opened.
    #[error("connect failed: {0}")]
    Connect(String),
    /// The server answered with an unexpected status or body.
    #[error("request failed ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server-provided message.
        message: String,
    },
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Text suitable for showing next to a failed message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Something the server pushed, or the end of the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// One text frame.
    Frame(String),
    /// The channel ended. `code` is absent when the peer vanished without
    /// a close frame.
    Closed {
        /// Close code, if one was received.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
}

/// An open live channel.
///
/// `inbound` yields frames until a single [`ChannelEvent::Closed`]. The
/// optional pump task is the transport's own I/O loop; it must exit once
/// `shutdown` is cancelled.
#[derive(Debug)]
pub struct Channel {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<ChannelEvent>,
    shutdown: CancellationToken,
    pump: Option<JoinHandle<()>>,
}

impl Channel {
    /// Assembles a channel from its parts.
    pub fn new(
        outbound: mpsc::UnboundedSender<String>,
        inbound: mpsc::UnboundedReceiver<ChannelEvent>,
        shutdown: CancellationToken,
        pump: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            shutdown,
            pump,
        }
    }

    /// Separates the writing half from the inbound stream.
    pub fn split(self) -> (ChannelWriter, mpsc::UnboundedReceiver<ChannelEvent>) {
        (
            ChannelWriter {
                outbound: self.outbound,
                shutdown: self.shutdown,
                pump: self.pump,
            },
            self.inbound,
        )
    }
}

/// Writing half of a [`Channel`]. Dropping it closes the channel.
#[derive(Debug)]
pub struct ChannelWriter {
    outbound: mpsc::UnboundedSender<String>,
    shutdown: CancellationToken,
    pump: Option<JoinHandle<()>>,
}

impl ChannelWriter {
    /// Queues a frame. Returns `false` once the transport is gone.
    pub fn send(&self, frame: String) -> bool {
        !self.shutdown.is_cancelled() && self.outbound.send(frame).is_ok()
    }

    /// Closes the channel and waits for the transport to finish, so the
    /// caller can open a replacement knowing this one is gone.
    pub async fn close(mut self) {
        self.shutdown.cancel();
        if let Some(pump) = self.pump.take() {
            let _ = pump.await;
        }
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Opens live channels.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Opens a channel authenticated with `token`. A rejected handshake
    /// still yields a channel; it delivers the close code and reason.
    async fn connect(&self, token: &str) -> Result<Channel, TransportError>;
}

impl std::fmt::Debug for dyn Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{Connector}}")
    }
}
