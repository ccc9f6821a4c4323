//! Route handlers organized by domain.

pub mod health;
pub mod messages;
pub mod presence;
pub mod signals;
pub mod ws;
