//! Per-recipient delivery receipts.

use relay_database::{
    conversation_repository, message_repository, message_status_repository, now_timestamp,
    DeliveryStatus, Message, Participant,
};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use super::{load_conversation, require_participant, resolve_message_ids, MessagingContext};
use crate::types::{
    DeliveryOutcome, MessageSelection, MessagingError, MessagingResult, ReceiptView,
};
use crate::utils::Action;

/// Tracks `sent -> delivered -> read` for every (message, recipient) pair.
#[derive(Clone)]
pub struct DeliveryTracker {
    ctx: MessagingContext,
}

impl DeliveryTracker {
    pub fn new(ctx: MessagingContext) -> Self {
        Self { ctx }
    }

    /// Create a `sent` receipt for every recipient except the sender. Runs on
    /// the caller's transaction; returns the user ids that got a receipt.
    pub async fn create_statuses(
        conn: &mut SqliteConnection,
        message: &Message,
        recipients: &[Participant],
    ) -> MessagingResult<Vec<i64>> {
        let recipients: Vec<&Participant> = recipients
            .iter()
            .filter(|p| p.is_active && p.user_id != message.sender_id)
            .collect();
        let participant_ids: Vec<i64> = recipients.iter().map(|p| p.id).collect();

        message_status_repository::insert_sent(
            conn,
            message.id,
            &participant_ids,
            &message.created_at,
        )
        .await?;

        Ok(recipients.iter().map(|p| p.user_id).collect())
    }

    /// Move the participant's receipts forward to `target`. `None` covers
    /// every message in the conversation. Receipts already at or beyond
    /// `target` are untouched.
    pub(crate) async fn advance(
        conn: &mut SqliteConnection,
        participant: &Participant,
        message_ids: Option<&[i64]>,
        target: DeliveryStatus,
        at: &str,
    ) -> MessagingResult<u64> {
        let updated = match message_ids {
            None => {
                message_status_repository::advance_all(
                    conn,
                    participant.id,
                    participant.conversation_id,
                    target,
                    at,
                )
                .await?
            }
            Some(ids) => {
                let mut updated = 0;
                for &message_id in ids {
                    updated += message_status_repository::advance_one(
                        conn,
                        participant.id,
                        message_id,
                        target,
                        at,
                    )
                    .await?;
                }
                updated
            }
        };

        debug!(
            participant_id = participant.id,
            status = %target,
            updated,
            "advanced delivery statuses"
        );
        Ok(updated)
    }

    /// Acknowledge delivery of messages to the caller's device.
    pub async fn mark_delivered(
        &self,
        conversation_id: &str,
        user_id: i64,
        selection: MessageSelection,
    ) -> MessagingResult<DeliveryOutcome> {
        let mut conn = self.ctx.pool().acquire().await?;
        let conversation = load_conversation(&mut conn, conversation_id).await?;
        let participant =
            require_participant(&mut conn, &conversation, user_id, &Action::Acknowledge).await?;

        let message_ids = match &selection {
            MessageSelection::All => None,
            MessageSelection::Only(ids) => {
                Some(resolve_message_ids(&mut conn, &conversation, ids).await?)
            }
        };

        let now = now_timestamp();
        let updated = Self::advance(
            &mut conn,
            &participant,
            message_ids.as_deref(),
            DeliveryStatus::Delivered,
            &now,
        )
        .await?;

        info!(conversation_id, user_id, updated, "marked messages delivered");
        Ok(DeliveryOutcome { updated })
    }

    /// Per-recipient receipts of one message, visible to any participant.
    pub async fn receipts(
        &self,
        message_id: &str,
        user_id: i64,
    ) -> MessagingResult<Vec<ReceiptView>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let message = message_repository::find_by_public_id(&mut conn, message_id)
            .await?
            .ok_or_else(|| MessagingError::not_found("message", message_id))?;
        let conversation = conversation_repository::find_by_id(&mut conn, message.conversation_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or_else(|| MessagingError::not_found("message", message_id))?;
        require_participant(&mut conn, &conversation, user_id, &Action::Read).await?;

        let receipts = message_status_repository::receipts_for_message(&mut conn, message.id)
            .await?;
        Ok(receipts.into_iter().map(ReceiptView::from).collect())
    }
}
