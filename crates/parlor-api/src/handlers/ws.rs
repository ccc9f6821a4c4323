//! Live-channel upgrade handler.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use parlor_realtime::Session;

use crate::state::AppState;

/// Close code sent to connections still open when the server stops.
const GOING_AWAY: u16 = 1001;

/// Query parameters of the upgrade request.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Bearer token.
    pub token: Option<String>,
}

/// GET /ws?token=...
///
/// The upgrade always succeeds; a rejected handshake is reported with a
/// close frame so the client can tell it apart from a network failure.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_ws_connection(state, query.token, socket))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, token: Option<String>, mut socket: WebSocket) {
    let Session {
        handle,
        mut outbound,
    } = match state.engine.connections.admit(token.as_deref()).await {
        Ok(session) => session,
        Err(rejected) => {
            debug!(code = rejected.code, reason = %rejected.reason, "Handshake rejected");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: rejected.code,
                    reason: rejected.reason.into(),
                })))
                .await;
            return;
        }
    };

    let (mut ws_tx, mut ws_rx) = socket.split();
    let shutdown = state.engine.shutdown_token();

    // Outbound forwarder
    let outbound_shutdown = shutdown.clone();
    let outbound_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = outbound_shutdown.cancelled() => {
                    let _ = ws_tx
                        .send(Message::Close(Some(CloseFrame {
                            code: GOING_AWAY,
                            reason: "Server shutting down".into(),
                        })))
                        .await;
                    break;
                }
                next = outbound.recv() => match next {
                    Some(frame) => {
                        if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    });

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    state
                        .engine
                        .connections
                        .handle_inbound(&handle, text.as_str())
                        .await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %handle.id, error = %e, "WebSocket error");
                    break;
                }
            },
        }
    }

    if shutdown.is_cancelled() {
        let _ = outbound_task.await;
    } else {
        outbound_task.abort();
    }
    state.engine.connections.disconnect(&handle).await;

    info!(conn_id = %handle.id, user_id = %handle.user_id, "WebSocket connection closed");
}
