//! # parlor-api
//!
//! HTTP layer for Parlor built on Axum.
//!
//! Provides the `/ws` live-channel upgrade, the bearer-authenticated
//! dispatch triggers (messages, agent thinking, read receipts, explicit
//! presence), the health probe, CORS, and error mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::build_app;
pub use state::AppState;
