//! Views returned by the messaging core. Internal row ids never leave the
//! crate; conversations, messages and invitations are addressed by public id.

use relay_database::{
    AttachmentRef, Conversation, ConversationType, DeliveryStatus, Invitation, InvitationStatus,
    Message, MessageRecord, MessageType, Participant, ParticipantRole, Receipt, ReplyTarget,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationView {
    pub id: String,
    pub business_id: i64,
    pub conversation_type: ConversationType,
    pub title: Option<String>,
    pub created_by: i64,
    pub is_active: bool,
    pub last_activity_at: String,
    pub created_at: String,
}

impl From<&Conversation> for ConversationView {
    fn from(conversation: &Conversation) -> Self {
        Self {
            id: conversation.public_id.clone(),
            business_id: conversation.business_id,
            conversation_type: conversation.conversation_type,
            title: conversation.title.clone(),
            created_by: conversation.created_by,
            is_active: conversation.is_active,
            last_activity_at: conversation.last_activity_at.clone(),
            created_at: conversation.created_at.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub user_id: i64,
    pub employee_ref: String,
    pub role: ParticipantRole,
    pub joined_at: String,
    pub last_read_at: Option<String>,
    pub is_muted: bool,
}

impl From<&Participant> for ParticipantView {
    fn from(participant: &Participant) -> Self {
        Self {
            user_id: participant.user_id,
            employee_ref: participant.employee_ref.clone(),
            role: participant.role,
            joined_at: participant.joined_at.clone(),
            last_read_at: participant.last_read_at.clone(),
            is_muted: participant.is_muted,
        }
    }
}

/// Short form of a message, used for reply targets and conversation lists.
/// Deleted messages keep their id but lose their content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePreview {
    pub id: String,
    pub sender_id: i64,
    pub content: Option<String>,
    pub is_deleted: bool,
}

impl From<&ReplyTarget> for MessagePreview {
    fn from(target: &ReplyTarget) -> Self {
        Self {
            id: target.public_id.clone(),
            sender_id: target.sender_id,
            content: (!target.is_deleted).then(|| target.content.clone()),
            is_deleted: target.is_deleted,
        }
    }
}

impl From<&Message> for MessagePreview {
    fn from(message: &Message) -> Self {
        Self {
            id: message.public_id.clone(),
            sender_id: message.sender_id,
            content: (!message.is_deleted).then(|| message.content.clone()),
            is_deleted: message.is_deleted,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub sent: i64,
    pub delivered: i64,
    pub read: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: i64,
    pub sender_employee_ref: String,
    pub message_type: MessageType,
    /// `None` once the message is deleted.
    pub content: Option<String>,
    pub attachment: Option<AttachmentRef>,
    pub reply_to: Option<MessagePreview>,
    pub is_edited: bool,
    pub edited_at: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub status_summary: StatusSummary,
    pub replies_count: i64,
}

impl MessageView {
    pub fn from_record(record: &MessageRecord, conversation_id: &str) -> Self {
        let message = &record.message;
        let visible = !message.is_deleted;

        Self {
            id: message.public_id.clone(),
            conversation_id: conversation_id.to_string(),
            sender_id: message.sender_id,
            sender_employee_ref: message.sender_employee_ref.clone(),
            message_type: message.message_type,
            content: visible.then(|| message.content.clone()),
            attachment: message.attachment.clone().filter(|_| visible),
            reply_to: record.reply_to.as_ref().map(MessagePreview::from),
            is_edited: message.is_edited,
            edited_at: message.edited_at.clone(),
            is_deleted: message.is_deleted,
            deleted_at: message.deleted_at.clone(),
            created_at: message.created_at.clone(),
            status_summary: StatusSummary {
                sent: record.receipts.sent,
                delivered: record.receipts.delivered,
                read: record.receipts.read,
            },
            replies_count: record.replies_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<MessageView>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptView {
    pub user_id: i64,
    pub status: DeliveryStatus,
    pub status_changed_at: String,
}

impl From<Receipt> for ReceiptView {
    fn from(receipt: Receipt) -> Self {
        Self {
            user_id: receipt.user_id,
            status: receipt.status,
            status_changed_at: receipt.status_changed_at,
        }
    }
}

/// One entry of a user's conversation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation: ConversationView,
    pub role: ParticipantRole,
    pub is_muted: bool,
    pub unread_count: i64,
    pub last_message: Option<MessagePreview>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    pub conversation: ConversationView,
    pub role: ParticipantRole,
    pub is_muted: bool,
    pub unread_count: i64,
    pub participants: Vec<ParticipantView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddParticipantsOutcome {
    pub added: Vec<i64>,
    pub already_active: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadOutcome {
    pub last_read_at: String,
    pub updated: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub updated: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvitationView {
    pub id: String,
    pub conversation_id: String,
    pub invited_by: i64,
    pub invited_user_id: i64,
    pub invitee_employee_ref: String,
    /// Effective status: a lapsed pending invitation reads as `expired`.
    pub status: InvitationStatus,
    pub message: Option<String>,
    pub expires_at: Option<String>,
    pub responded_at: Option<String>,
    pub created_at: String,
}

impl InvitationView {
    pub fn new(invitation: &Invitation, conversation_id: &str, now: &str) -> Self {
        Self {
            id: invitation.public_id.clone(),
            conversation_id: conversation_id.to_string(),
            invited_by: invitation.invited_by,
            invited_user_id: invitation.invited_user_id,
            invitee_employee_ref: invitation.invitee_employee_ref.clone(),
            status: invitation.effective_status(now),
            message: invitation.message.clone(),
            expires_at: invitation.expires_at.clone(),
            responded_at: invitation.responded_at.clone(),
            created_at: invitation.created_at.clone(),
        }
    }
}
