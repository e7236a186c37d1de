//! Request and response bodies of the REST surface.

use relay_database::{
    AttachmentRef, ConversationType, InvitationStatus, MessageType, ParticipantRole,
};
use relay_messaging::{
    AppendMessageRequest, ConversationDetail, ConversationSummary, ConversationView,
    CreateConversationRequest, CreateInvitationRequest, DeliveryOutcome, InvitationView,
    MessageSelection, MessageView, ParticipantView, ReadOutcome, ReceiptView,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::ApiError;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateConversationBody {
    pub business_id: i64,
    #[serde(rename = "type", alias = "conversation_type")]
    #[schema(value_type = String, example = "group")]
    pub conversation_type: ConversationType,
    pub title: Option<String>,
    #[serde(alias = "participant_user_ids")]
    pub participant_ids: Vec<i64>,
}

impl From<CreateConversationBody> for CreateConversationRequest {
    fn from(body: CreateConversationBody) -> Self {
        Self {
            business_id: body.business_id,
            conversation_type: body.conversation_type,
            title: body.title,
            participant_ids: body.participant_ids,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListConversationsParams {
    pub business_id: Option<i64>,
    #[param(value_type = Option<String>)]
    pub conversation_type: Option<ConversationType>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddParticipantsBody {
    #[serde(alias = "user_ids")]
    pub participant_ids: Vec<i64>,
}

/// Either `{"mark_all": true}` or `{"message_ids": [...]}`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AcknowledgeBody {
    #[serde(default)]
    pub mark_all: bool,
    #[serde(default)]
    pub message_ids: Option<Vec<String>>,
}

impl AcknowledgeBody {
    pub fn into_selection(self) -> Result<MessageSelection, ApiError> {
        match (self.mark_all, self.message_ids) {
            (true, None) => Ok(MessageSelection::All),
            (false, Some(ids)) if !ids.is_empty() => Ok(MessageSelection::Only(ids)),
            (true, Some(_)) => Err(ApiError::bad_request(
                "mark_all and message_ids are mutually exclusive",
            )),
            _ => Err(ApiError::bad_request("either mark_all or message_ids is required")),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MuteBody {
    pub muted: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeRoleBody {
    #[schema(value_type = String, example = "admin")]
    pub role: ParticipantRole,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListMessagesParams {
    pub conversation_id: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostMessageBody {
    pub conversation_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "text")]
    pub message_type: Option<MessageType>,
    #[schema(value_type = Option<Object>)]
    pub attachment: Option<AttachmentRef>,
    pub reply_to: Option<String>,
}

impl PostMessageBody {
    pub fn into_request(self) -> (String, AppendMessageRequest) {
        let request = AppendMessageRequest {
            content: self.content,
            message_type: self.message_type.unwrap_or(MessageType::Text),
            attachment: self.attachment,
            reply_to: self.reply_to,
        };
        (self.conversation_id, request)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditMessageBody {
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInvitationBody {
    pub conversation_id: String,
    pub invited_user_id: i64,
    pub message: Option<String>,
    /// RFC 3339 timestamp; takes precedence over `expires_in_hours`.
    pub expires_at: Option<String>,
    pub expires_in_hours: Option<i64>,
}

impl CreateInvitationBody {
    pub fn into_request(self) -> (String, CreateInvitationRequest) {
        let request = CreateInvitationRequest {
            invited_user_id: self.invited_user_id,
            message: self.message,
            expires_at: self.expires_at,
            expires_in_hours: self.expires_in_hours,
        };
        (self.conversation_id, request)
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListInvitationsParams {
    /// Invitations of one conversation instead of the caller's own.
    pub conversation_id: Option<String>,
    #[param(value_type = Option<String>)]
    pub status: Option<InvitationStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationsResponse {
    #[schema(value_type = Vec<Object>)]
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationResponse {
    #[schema(value_type = Object)]
    pub conversation: ConversationDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationStateResponse {
    #[schema(value_type = Object)]
    pub conversation: ConversationView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantsResponse {
    #[schema(value_type = Vec<Object>)]
    pub participants: Vec<ParticipantView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantResponse {
    #[schema(value_type = Object)]
    pub participant: ParticipantView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddParticipantsResponse {
    pub added: Vec<i64>,
    pub already_active: Vec<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadResponse {
    pub last_read_at: String,
    pub updated: u64,
}

impl From<ReadOutcome> for ReadResponse {
    fn from(outcome: ReadOutcome) -> Self {
        Self {
            last_read_at: outcome.last_read_at,
            updated: outcome.updated,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveredResponse {
    pub updated: u64,
}

impl From<DeliveryOutcome> for DeliveredResponse {
    fn from(outcome: DeliveryOutcome) -> Self {
        Self {
            updated: outcome.updated,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnreadCountResponse {
    pub conversation_id: String,
    pub unread_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessagesResponse {
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<MessageView>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(value_type = Object)]
    pub message: MessageView,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiptsResponse {
    #[schema(value_type = Vec<Object>)]
    pub receipts: Vec<ReceiptView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvitationsResponse {
    #[schema(value_type = Vec<Object>)]
    pub invitations: Vec<InvitationView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvitationResponse {
    #[schema(value_type = Object)]
    pub invitation: InvitationView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledge_body_needs_exactly_one_form() {
        let all = AcknowledgeBody {
            mark_all: true,
            message_ids: None,
        };
        assert_eq!(all.into_selection().unwrap(), MessageSelection::All);

        let some = AcknowledgeBody {
            mark_all: false,
            message_ids: Some(vec!["m1".to_string()]),
        };
        assert_eq!(
            some.into_selection().unwrap(),
            MessageSelection::Only(vec!["m1".to_string()])
        );

        assert!(AcknowledgeBody::default().into_selection().is_err());
        let both = AcknowledgeBody {
            mark_all: true,
            message_ids: Some(vec![]),
        };
        assert!(both.into_selection().is_err());
    }

    #[test]
    fn create_body_accepts_type_field() {
        let body: CreateConversationBody = serde_json::from_str(
            r#"{"business_id": 1, "type": "business_wide", "participant_user_ids": [2, 3]}"#,
        )
        .unwrap();
        assert_eq!(body.conversation_type, ConversationType::BusinessWide);
        assert_eq!(body.participant_ids, vec![2, 3]);
        assert!(body.title.is_none());
    }
}
