//! # parlor-store
//!
//! The real-time core consumes storage through three narrow traits:
//! membership lookup, the user directory, and message/receipt writes.
//! [`memory::MemoryStore`] implements all of them in process for the
//! development server and the test suites.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{ChatStore, MembershipOracle, MessageStore, UserDirectory};
