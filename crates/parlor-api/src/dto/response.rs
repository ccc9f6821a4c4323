//! Response DTOs.

use serde::{Deserialize, Serialize};

use parlor_entity::{Message, ReadReceipt, UserProfile};

/// A created message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// The stored message.
    pub message: Message,
}

/// A recorded read marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptResponse {
    /// The stored receipt.
    pub receipt: ReadReceipt,
}

/// The caller's profile after a presence change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    /// Updated profile.
    pub user: UserProfile,
}

/// Acknowledgement with no payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    /// Always `true`.
    pub ok: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Application version.
    pub version: String,
    /// Live connections.
    pub connections: usize,
    /// Distinct connected users.
    pub users: usize,
}
