//! Approval request records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parlor_core::types::{ApprovalId, UserId};

/// Lifecycle state of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Awaiting a decision.
    Pending,
    /// Approved by the target.
    Approved,
    /// Rejected by the target.
    Rejected,
}

/// A request from one user that another user must decide on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    /// Request ID.
    pub id: ApprovalId,
    /// Who asked.
    pub requester_id: UserId,
    /// Who decides.
    pub target_id: UserId,
    /// Current state.
    pub status: ApprovalStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Decision time.
    #[serde(default)]
    pub decided_at: Option<DateTime<Utc>>,
}

impl ApprovalRequest {
    /// The users an update of this request is delivered to.
    pub fn parties(&self) -> [UserId; 2] {
        [self.requester_id, self.target_id]
    }
}
