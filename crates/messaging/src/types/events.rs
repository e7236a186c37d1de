//! Events published after a state change commits.

use relay_database::{InvitationStatus, MessageType, ParticipantRole};
use serde::{Deserialize, Serialize};

/// Notification payloads handed to the configured notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum MessagingEvent {
    ConversationCreated {
        conversation_id: String,
        business_id: i64,
        created_by: i64,
        participant_ids: Vec<i64>,
    },

    ParticipantsAdded {
        conversation_id: String,
        added_by: i64,
        user_ids: Vec<i64>,
    },

    ParticipantLeft {
        conversation_id: String,
        user_id: i64,
    },

    ParticipantRoleChanged {
        conversation_id: String,
        user_id: i64,
        role: ParticipantRole,
        changed_by: i64,
    },

    /// `recipient_ids` are the active participants other than the sender at
    /// the time the message committed.
    MessageCreated {
        conversation_id: String,
        message_id: String,
        sender_id: i64,
        message_type: MessageType,
        reply_to: Option<String>,
        recipient_ids: Vec<i64>,
    },

    MessageEdited {
        conversation_id: String,
        message_id: String,
        sender_id: i64,
    },

    MessageDeleted {
        conversation_id: String,
        message_id: String,
        sender_id: i64,
    },

    InvitationCreated {
        invitation_id: String,
        conversation_id: String,
        invited_by: i64,
        invited_user_id: i64,
    },

    InvitationStatusChanged {
        invitation_id: String,
        conversation_id: String,
        invited_by: i64,
        invited_user_id: i64,
        status: InvitationStatus,
    },
}

impl MessagingEvent {
    /// Get the conversation the event belongs to
    pub fn conversation_id(&self) -> &str {
        match self {
            MessagingEvent::ConversationCreated { conversation_id, .. }
            | MessagingEvent::ParticipantsAdded { conversation_id, .. }
            | MessagingEvent::ParticipantLeft { conversation_id, .. }
            | MessagingEvent::ParticipantRoleChanged { conversation_id, .. }
            | MessagingEvent::MessageCreated { conversation_id, .. }
            | MessagingEvent::MessageEdited { conversation_id, .. }
            | MessagingEvent::MessageDeleted { conversation_id, .. }
            | MessagingEvent::InvitationCreated { conversation_id, .. }
            | MessagingEvent::InvitationStatusChanged { conversation_id, .. } => conversation_id,
        }
    }

    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            MessagingEvent::ConversationCreated { .. } => "conversation_created",
            MessagingEvent::ParticipantsAdded { .. } => "participants_added",
            MessagingEvent::ParticipantLeft { .. } => "participant_left",
            MessagingEvent::ParticipantRoleChanged { .. } => "participant_role_changed",
            MessagingEvent::MessageCreated { .. } => "message_created",
            MessagingEvent::MessageEdited { .. } => "message_edited",
            MessagingEvent::MessageDeleted { .. } => "message_deleted",
            MessagingEvent::InvitationCreated { .. } => "invitation_created",
            MessagingEvent::InvitationStatusChanged { .. } => "invitation_status_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = MessagingEvent::InvitationStatusChanged {
            invitation_id: "inv1".to_string(),
            conversation_id: "conv1".to_string(),
            invited_by: 1,
            invited_user_id: 2,
            status: InvitationStatus::Accepted,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "InvitationStatusChanged");
        assert_eq!(json["data"]["status"], "accepted");
        assert_eq!(event.conversation_id(), "conv1");
        assert_eq!(event.event_type(), "invitation_status_changed");
    }
}
