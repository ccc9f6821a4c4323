//! Route definitions for the Parlor HTTP API.
//!
//! Dispatch triggers are mounted under `/api`; the live channel is `/ws`.

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::handlers;
use crate::state::AppState;

/// Build the Axum router with every route, threading `AppState` through
/// `.with_state(state)`.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(conversation_routes())
        .merge(user_routes())
        .merge(health_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .with_state(state)
}

/// Conversation-scoped triggers: messages, agent thinking, read markers
fn conversation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/conversations/{id}/messages",
            post(handlers::messages::send_message),
        )
        .route(
            "/conversations/{id}/thinking",
            post(handlers::signals::set_thinking),
        )
        .route("/conversations/{id}/read", post(handlers::signals::mark_read))
}

/// Caller self-service
fn user_routes() -> Router<AppState> {
    Router::new().route("/users/me/presence", put(handlers::presence::set_presence))
}

/// Liveness
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
