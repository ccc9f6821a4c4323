//! Collaborator traits for durable storage.

pub mod directory;
pub mod membership;
pub mod messages;

pub use directory::UserDirectory;
pub use membership::MembershipOracle;
pub use messages::MessageStore;

/// Everything the real-time engine needs from durable storage.
pub trait ChatStore: MembershipOracle + UserDirectory + MessageStore {}

impl<T> ChatStore for T where T: MembershipOracle + UserDirectory + MessageStore {}
