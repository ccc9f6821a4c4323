//! Client-local caches.

pub mod messages;
pub mod state;
