//! # parlor-entity
//!
//! Domain records shared by the server engine, the durable-store
//! collaborator, and the client. Field names serialize in camelCase to
//! match the live-channel wire format.

pub mod approval;
pub mod conversation;
pub mod event;
pub mod message;
pub mod presence;
pub mod receipt;
pub mod user;

pub use approval::{ApprovalRequest, ApprovalStatus};
pub use conversation::{Conversation, ConversationKind, Member, MemberCapabilities};
pub use event::{ClientEvent, ClientEventKind, ServerEvent};
pub use message::{Message, MessageFormat, NewMessage};
pub use presence::PresenceStatus;
pub use receipt::ReadReceipt;
pub use user::{AccountStatus, UserProfile};
