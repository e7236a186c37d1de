//! Conversation entity definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub public_id: String,
    pub business_id: i64,
    pub conversation_type: ConversationType,
    pub title: Option<String>,
    pub created_by: i64,
    pub is_active: bool,
    pub last_activity_at: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct NewConversation {
    pub business_id: i64,
    pub conversation_type: ConversationType,
    pub title: Option<String>,
    pub created_by: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    Direct,
    Group,
    BusinessWide,
}

impl ConversationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::Direct => "direct",
            ConversationType::Group => "group",
            ConversationType::BusinessWide => "business_wide",
        }
    }
}

impl FromStr for ConversationType {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ConversationType::Direct),
            "group" => Ok(ConversationType::Group),
            "business_wide" => Ok(ConversationType::BusinessWide),
            other => Err(DatabaseError::invalid_value(format!(
                "unknown conversation type: {other}"
            ))),
        }
    }
}

impl fmt::Display for ConversationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
