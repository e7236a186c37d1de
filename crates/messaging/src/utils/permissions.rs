//! Capability checks for conversation participants.

use relay_database::{Conversation, Participant, ParticipantRole};

use crate::types::{MessagingError, MessagingResult};

/// Things a participant may try to do inside a conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Read,
    Post,
    Acknowledge,
    Mute,
    ManageParticipants,
    Invite,
    Deactivate,
    /// Edit or delete a message written by `sender_id`.
    ModifyMessage { sender_id: i64 },
    ChangeRole {
        target_user_id: i64,
        current: ParticipantRole,
        requested: ParticipantRole,
    },
}

impl Action {
    fn minimum_role(&self) -> ParticipantRole {
        match self {
            Action::Read
            | Action::Post
            | Action::Acknowledge
            | Action::Mute
            | Action::ModifyMessage { .. } => ParticipantRole::Member,
            Action::ManageParticipants
            | Action::Invite
            | Action::Deactivate
            | Action::ChangeRole { .. } => ParticipantRole::Admin,
        }
    }
}

/// Decide whether `actor` may perform `action`. A missing or inactive actor
/// is never a participant, whatever the action.
pub fn authorize(
    actor: Option<&Participant>,
    conversation: &Conversation,
    user_id: i64,
    action: &Action,
) -> MessagingResult<()> {
    let actor = match actor {
        Some(actor) if actor.is_active && actor.conversation_id == conversation.id => actor,
        _ => {
            return Err(MessagingError::not_a_participant(
                &conversation.public_id,
                user_id,
            ))
        }
    };

    if !actor.role.has_at_least(action.minimum_role()) {
        return Err(MessagingError::forbidden(format!(
            "{} role cannot perform this action",
            actor.role
        )));
    }

    match action {
        Action::ModifyMessage { sender_id } if *sender_id != actor.user_id => Err(
            MessagingError::forbidden("only the sender can modify a message"),
        ),
        Action::ChangeRole {
            target_user_id,
            current,
            requested,
        } => {
            if *target_user_id == actor.user_id {
                return Err(MessagingError::forbidden("cannot change your own role"));
            }
            let touches_owner =
                *current == ParticipantRole::Owner || *requested == ParticipantRole::Owner;
            if touches_owner && actor.role != ParticipantRole::Owner {
                return Err(MessagingError::forbidden(
                    "only owners can grant or revoke the owner role",
                ));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
