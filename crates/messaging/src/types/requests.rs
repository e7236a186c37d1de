//! Request types for messaging operations.

use relay_database::{AttachmentRef, ConversationType, InvitationStatus, MessageType};
use serde::{Deserialize, Serialize};

/// Request to open a new conversation. The creator is passed separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConversationRequest {
    pub business_id: i64,
    pub conversation_type: ConversationType,
    #[serde(default)]
    pub title: Option<String>,
    pub participant_ids: Vec<i64>,
}

/// Narrows a user's conversation list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ConversationFilter {
    #[serde(default)]
    pub business_id: Option<i64>,
    #[serde(default)]
    pub conversation_type: Option<ConversationType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendMessageRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_message_type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub attachment: Option<AttachmentRef>,
    /// Public id of the message being replied to.
    #[serde(default)]
    pub reply_to: Option<String>,
}

fn default_message_type() -> MessageType {
    MessageType::Text
}

impl AppendMessageRequest {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            message_type: MessageType::Text,
            attachment: None,
            reply_to: None,
        }
    }

    pub fn reply(content: impl Into<String>, reply_to: impl Into<String>) -> Self {
        Self {
            reply_to: Some(reply_to.into()),
            ..Self::text(content)
        }
    }
}

/// Paging for the message log. Missing values fall back to configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListMessagesQuery {
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub include_deleted: bool,
}

/// Which messages a read or delivery acknowledgement covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSelection {
    All,
    /// Public message ids.
    Only(Vec<String>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateInvitationRequest {
    pub invited_user_id: i64,
    #[serde(default)]
    pub message: Option<String>,
    /// Absolute RFC 3339 expiry. Takes precedence over `expires_in_hours`.
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub expires_in_hours: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct InvitationFilter {
    #[serde(default)]
    pub status: Option<InvitationStatus>,
}
