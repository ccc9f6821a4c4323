//! # parlor-core
//!
//! Core crate for Parlor. Contains configuration schemas, typed
//! identifiers, the cancellable expiry timer used by every self-expiring
//! piece of state, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Parlor crates.

pub mod config;
pub mod error;
pub mod result;
pub mod timer;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
