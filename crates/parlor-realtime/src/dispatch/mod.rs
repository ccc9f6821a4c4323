//! Conversation-scoped event fan-out.

pub mod dispatcher;

pub use dispatcher::EventDispatcher;
