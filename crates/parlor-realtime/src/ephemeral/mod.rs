//! Short-lived typing/thinking signals.

pub mod signal;
pub mod tracker;

pub use signal::{Signal, SignalKind, SignalRelay, SignalTransition};
pub use tracker::EphemeralTracker;
