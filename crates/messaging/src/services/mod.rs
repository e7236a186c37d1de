//! Business logic services for the messaging core.
//!
//! Each service owns a clone of the shared [`MessagingContext`]. Multi-row
//! changes run in one transaction whose first statement is a write, so the
//! SQLite write lock is taken up front. Timestamps that other transactions
//! compare against (`created_at`, `last_read_at`) are read only after that
//! first write. Events are published only after the commit.

pub mod conversations;
pub mod delivery;
pub mod invitations;
pub mod messages;
pub mod unread;

pub use conversations::ConversationRegistry;
pub use delivery::DeliveryTracker;
pub use invitations::InvitationWorkflow;
pub use messages::MessageLog;
pub use unread::UnreadCounter;

use relay_config::MessagingConfig;
use relay_database::{
    conversation_repository, message_repository, participant_repository, Conversation,
    NewParticipant, Participant, ParticipantRole,
};
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;

use crate::directory::DirectoryGate;
use crate::notifier::EventDispatcher;
use crate::types::{MessagingError, MessagingEvent, MessagingResult};
use crate::utils::{authorize, Action};

/// Everything the services share: storage, collaborators and limits.
#[derive(Clone)]
pub struct MessagingContext {
    pool: SqlitePool,
    directory: DirectoryGate,
    events: EventDispatcher,
    settings: Arc<MessagingConfig>,
}

impl MessagingContext {
    pub fn new(
        pool: SqlitePool,
        directory: DirectoryGate,
        events: EventDispatcher,
        settings: MessagingConfig,
    ) -> Self {
        Self {
            pool,
            directory,
            events,
            settings: Arc::new(settings),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn directory(&self) -> &DirectoryGate {
        &self.directory
    }

    pub fn settings(&self) -> &MessagingConfig {
        &self.settings
    }

    pub(crate) fn publish(&self, event: MessagingEvent) {
        self.events.publish(event);
    }
}

/// Load a conversation that is still active.
pub(crate) async fn load_conversation(
    conn: &mut SqliteConnection,
    public_id: &str,
) -> MessagingResult<Conversation> {
    conversation_repository::find_by_public_id(conn, public_id)
        .await?
        .filter(|conversation| conversation.is_active)
        .ok_or_else(|| MessagingError::not_found("conversation", public_id))
}

/// Load the caller's active membership and check it allows `action`.
pub(crate) async fn require_participant(
    conn: &mut SqliteConnection,
    conversation: &Conversation,
    user_id: i64,
    action: &Action,
) -> MessagingResult<Participant> {
    let participant = participant_repository::find_active(conn, conversation.id, user_id).await?;
    authorize(participant.as_ref(), conversation, user_id, action)?;
    participant.ok_or_else(|| MessagingError::not_a_participant(&conversation.public_id, user_id))
}

/// Map public message ids to row ids, rejecting ids from other conversations.
pub(crate) async fn resolve_message_ids(
    conn: &mut SqliteConnection,
    conversation: &Conversation,
    public_ids: &[String],
) -> MessagingResult<Vec<i64>> {
    let mut ids = Vec::with_capacity(public_ids.len());
    for public_id in public_ids {
        let message = message_repository::find_in_conversation(conn, conversation.id, public_id)
            .await?
            .ok_or_else(|| MessagingError::not_found("message", public_id))?;
        if !ids.contains(&message.id) {
            ids.push(message.id);
        }
    }
    Ok(ids)
}

/// Make `user_id` an active participant. Inserts a new row, reactivates a
/// row left behind by an earlier leave, and returns `None` when the user was
/// already active. Insert comes first so a transaction calling this takes
/// the write lock before it reads.
pub(crate) async fn admit(
    conn: &mut SqliteConnection,
    conversation_id: i64,
    user_id: i64,
    employee_ref: &str,
    role: ParticipantRole,
) -> MessagingResult<Option<Participant>> {
    let request = NewParticipant {
        conversation_id,
        user_id,
        employee_ref: employee_ref.to_string(),
        role,
    };

    match participant_repository::insert(conn, &request).await {
        Ok(participant) => Ok(Some(participant)),
        Err(err) if err.is_duplicate_on("participants") => {
            let existing = participant_repository::find(conn, conversation_id, user_id)
                .await?
                .ok_or_else(|| MessagingError::from(err))?;
            if existing.is_active {
                return Ok(None);
            }
            let participant =
                participant_repository::reactivate(conn, existing.id, role, employee_ref).await?;
            Ok(Some(participant))
        }
        Err(err) => Err(err.into()),
    }
}

/// Drop duplicates while keeping first-seen order.
pub(crate) fn dedupe(user_ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut seen = Vec::new();
    for user_id in user_ids {
        if !seen.contains(&user_id) {
            seen.push(user_id);
        }
    }
    seen
}
