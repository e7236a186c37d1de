//! Invitation entity definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
    pub id: i64,
    pub public_id: String,
    pub conversation_id: i64,
    pub invited_by: i64,
    pub invited_user_id: i64,
    pub invitee_employee_ref: String,
    pub status: InvitationStatus,
    pub message: Option<String>,
    pub expires_at: Option<String>,
    pub responded_at: Option<String>,
    pub created_at: String,
}

impl Invitation {
    /// Whether a pending invitation has run past its expiry at `now`.
    /// Both values are storage-format timestamps.
    pub fn is_expired_at(&self, now: &str) -> bool {
        self.status == InvitationStatus::Pending
            && self
                .expires_at
                .as_deref()
                .is_some_and(|expires_at| expires_at <= now)
    }

    /// Status as seen by readers: a lapsed pending invitation reads as expired
    /// even before anything persists that.
    pub fn effective_status(&self, now: &str) -> InvitationStatus {
        if self.is_expired_at(now) {
            InvitationStatus::Expired
        } else {
            self.status
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewInvitation {
    pub conversation_id: i64,
    pub invited_by: i64,
    pub invited_user_id: i64,
    pub invitee_employee_ref: String,
    pub message: Option<String>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
            InvitationStatus::Expired => "expired",
        }
    }

    /// Check if the invitation is in a final state
    pub fn is_final(&self) -> bool {
        !matches!(self, InvitationStatus::Pending)
    }
}

impl FromStr for InvitationStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InvitationStatus::Pending),
            "accepted" => Ok(InvitationStatus::Accepted),
            "declined" => Ok(InvitationStatus::Declined),
            "expired" => Ok(InvitationStatus::Expired),
            other => Err(DatabaseError::invalid_value(format!(
                "unknown invitation status: {other}"
            ))),
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
