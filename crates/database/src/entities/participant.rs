//! Participant entity definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::DatabaseError;

/// A user's membership row in one conversation. Rows are never removed;
/// leaving flips `is_active`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub conversation_id: i64,
    pub user_id: i64,
    pub employee_ref: String,
    pub role: ParticipantRole,
    pub joined_at: String,
    /// `None` until the participant reads the conversation for the first time.
    pub last_read_at: Option<String>,
    pub is_muted: bool,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewParticipant {
    pub conversation_id: i64,
    pub user_id: i64,
    pub employee_ref: String,
    pub role: ParticipantRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Member,
    Admin,
    Owner,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Member => "member",
            ParticipantRole::Admin => "admin",
            ParticipantRole::Owner => "owner",
        }
    }

    /// Get permission level (higher number = more permissions)
    pub fn permission_level(&self) -> u8 {
        match self {
            ParticipantRole::Owner => 3,
            ParticipantRole::Admin => 2,
            ParticipantRole::Member => 1,
        }
    }

    pub fn has_at_least(&self, required: ParticipantRole) -> bool {
        self.permission_level() >= required.permission_level()
    }
}

impl FromStr for ParticipantRole {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(ParticipantRole::Member),
            "admin" => Ok(ParticipantRole::Admin),
            "owner" => Ok(ParticipantRole::Owner),
            other => Err(DatabaseError::invalid_value(format!(
                "unknown participant role: {other}"
            ))),
        }
    }
}

impl fmt::Display for ParticipantRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
