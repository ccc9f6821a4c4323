//! Live channel over a WebSocket.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::{Channel, ChannelEvent, Connector, TransportError};

/// Opens `{base}/ws?token=...` with `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    base_url: String,
}

impl WsConnector {
    /// `base_url` is the server root, e.g. `ws://localhost:4433`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, token: &str) -> String {
        format!("{}/ws?token={token}", self.base_url)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, token: &str) -> Result<Channel, TransportError> {
        let (stream, _) = connect_async(self.url(token))
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!(url = %self.base_url, "WebSocket handshake completed");

        let (mut write, mut read) = stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();

        let pump = tokio::spawn(async move {
            let closed = loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        let _ = write
                            .send(Message::Close(Some(CloseFrame {
                                code: CloseCode::Normal,
                                reason: "client closed".into(),
                            })))
                            .await;
                        break ChannelEvent::Closed {
                            code: Some(1000),
                            reason: "client closed".to_string(),
                        };
                    }
                    Some(frame) = out_rx.recv() => {
                        trace!("Sending text frame");
                        if let Err(e) = write.send(Message::Text(frame.into())).await {
                            warn!(error = %e, "WebSocket send failed");
                            break ChannelEvent::Closed { code: None, reason: e.to_string() };
                        }
                    }
                    incoming = read.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let _ = in_tx.send(ChannelEvent::Frame(text.as_str().to_string()));
                        }
                        Some(Ok(Message::Close(frame))) => {
                            break match frame {
                                Some(frame) => ChannelEvent::Closed {
                                    code: Some(u16::from(frame.code)),
                                    reason: frame.reason.to_string(),
                                },
                                None => ChannelEvent::Closed { code: None, reason: String::new() },
                            };
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket read failed");
                            break ChannelEvent::Closed { code: None, reason: e.to_string() };
                        }
                        None => break ChannelEvent::Closed { code: None, reason: String::new() },
                    },
                }
            };
            let _ = in_tx.send(closed);
        });

        Ok(Channel::new(out_tx, in_rx, shutdown, Some(pump)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_carries_token() {
        let connector = WsConnector::new("ws://localhost:4433/");
        assert_eq!(connector.url("abc.def"), "ws://localhost:4433/ws?token=abc.def");
    }
}
