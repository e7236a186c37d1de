//! The append-only message log.

use relay_database::{
    conversation_repository, message_repository, participant_repository, Conversation,
    DatabaseError, Message, NewMessage,
};
use sqlx::SqliteConnection;
use tracing::info;

use super::{load_conversation, require_participant, DeliveryTracker, MessagingContext};
use crate::types::{
    AppendMessageRequest, ListMessagesQuery, MessagePage, MessageView, MessagingError,
    MessagingEvent, MessagingResult,
};
use crate::utils::validation::Validator;
use crate::utils::Action;

/// Appends, edits, soft-deletes and lists messages.
#[derive(Clone)]
pub struct MessageLog {
    ctx: MessagingContext,
}

impl MessageLog {
    pub fn new(ctx: MessagingContext) -> Self {
        Self { ctx }
    }

    /// Append a message. The message row, a `sent` receipt for every other
    /// active participant and the conversation's activity bump commit
    /// together or not at all.
    pub async fn append(
        &self,
        conversation_id: &str,
        sender_id: i64,
        request: AppendMessageRequest,
    ) -> MessagingResult<MessageView> {
        Validator::message_body(
            &request.content,
            request.message_type,
            request.attachment.as_ref(),
            self.ctx.settings(),
        )?;

        let (conversation, sender, reply_to_id) = {
            let mut conn = self.ctx.pool().acquire().await?;
            let conversation = load_conversation(&mut conn, conversation_id).await?;
            let sender =
                require_participant(&mut conn, &conversation, sender_id, &Action::Post).await?;

            let reply_to_id = match request.reply_to.as_deref() {
                Some(reply_to) => Some(
                    message_repository::find_in_conversation(&mut conn, conversation.id, reply_to)
                        .await?
                        .filter(|target| !target.is_deleted)
                        .ok_or_else(|| MessagingError::invalid_reply_target(reply_to))?
                        .id,
                ),
                None => None,
            };
            (conversation, sender, reply_to_id)
        };

        let mut tx = self.ctx.pool().begin().await?;
        // The insert stamps `created_at`; it must run with the lock held.
        conversation_repository::lock_for_write(&mut *tx, conversation.id).await?;
        let message = message_repository::insert(
            &mut *tx,
            &NewMessage {
                conversation_id: conversation.id,
                sender_id,
                sender_employee_ref: sender.employee_ref.clone(),
                content: request.content,
                message_type: request.message_type,
                attachment: request.attachment,
                reply_to_id,
            },
        )
        .await?;

        // Membership is re-read under the write lock so the receipt set
        // matches the participants at commit time.
        let participants = participant_repository::list_active(&mut *tx, conversation.id).await?;
        if !participants.iter().any(|p| p.user_id == sender_id) {
            return Err(MessagingError::not_a_participant(conversation_id, sender_id));
        }
        let recipient_ids = DeliveryTracker::create_statuses(&mut *tx, &message, &participants)
            .await?;
        conversation_repository::touch_activity(&mut *tx, conversation.id, &message.created_at)
            .await?;
        tx.commit().await?;

        info!(
            conversation_id,
            message_id = %message.public_id,
            sender_id,
            recipients = recipient_ids.len(),
            "appended message"
        );

        self.ctx.publish(MessagingEvent::MessageCreated {
            conversation_id: conversation.public_id.clone(),
            message_id: message.public_id.clone(),
            sender_id,
            message_type: message.message_type,
            reply_to: request.reply_to,
            recipient_ids,
        });

        let mut conn = self.ctx.pool().acquire().await?;
        Self::render(&mut conn, &conversation, message.id).await
    }

    /// Replace the text of one of the caller's own messages.
    pub async fn edit(
        &self,
        message_id: &str,
        user_id: i64,
        content: &str,
    ) -> MessagingResult<MessageView> {
        Validator::edited_content(content, self.ctx.settings())?;

        let mut conn = self.ctx.pool().acquire().await?;
        let (conversation, message) =
            Self::locate(&mut conn, message_id, user_id, |message| Action::ModifyMessage {
                sender_id: message.sender_id,
            })
            .await?;

        if message.is_deleted {
            return Err(MessagingError::not_found("message", message_id));
        }

        let edited = message_repository::update_content(&mut conn, message.id, content)
            .await?
            .ok_or_else(|| MessagingError::not_found("message", message_id))?;

        self.ctx.publish(MessagingEvent::MessageEdited {
            conversation_id: conversation.public_id.clone(),
            message_id: edited.public_id.clone(),
            sender_id: edited.sender_id,
        });

        Self::render(&mut conn, &conversation, edited.id).await
    }

    /// Mark one of the caller's messages deleted. The row stays so replies
    /// and receipts keep pointing at it.
    pub async fn soft_delete(
        &self,
        message_id: &str,
        user_id: i64,
    ) -> MessagingResult<MessageView> {
        let mut conn = self.ctx.pool().acquire().await?;
        let (conversation, message) =
            Self::locate(&mut conn, message_id, user_id, |message| Action::ModifyMessage {
                sender_id: message.sender_id,
            })
            .await?;

        if message.is_deleted {
            return Err(MessagingError::not_found("message", message_id));
        }

        let deleted = match message_repository::soft_delete(&mut conn, message.id).await {
            Ok(deleted) => deleted,
            Err(DatabaseError::NotFound(_)) => {
                return Err(MessagingError::not_found("message", message_id))
            }
            Err(err) => return Err(err.into()),
        };

        self.ctx.publish(MessagingEvent::MessageDeleted {
            conversation_id: conversation.public_id.clone(),
            message_id: deleted.public_id.clone(),
            sender_id: deleted.sender_id,
        });

        Self::render(&mut conn, &conversation, deleted.id).await
    }

    /// Newest first. Deleted messages are left out unless the query asks
    /// for them, in which case they come back as tombstones.
    pub async fn list(
        &self,
        conversation_id: &str,
        user_id: i64,
        query: ListMessagesQuery,
    ) -> MessagingResult<MessagePage> {
        let (limit, offset) = Validator::page(query.limit, query.offset, self.ctx.settings())?;

        let mut conn = self.ctx.pool().acquire().await?;
        let conversation = load_conversation(&mut conn, conversation_id).await?;
        require_participant(&mut conn, &conversation, user_id, &Action::Read).await?;

        let records = message_repository::list_records(
            &mut conn,
            conversation.id,
            query.include_deleted,
            limit,
            offset,
        )
        .await?;

        Ok(MessagePage {
            messages: records
                .iter()
                .map(|record| MessageView::from_record(record, &conversation.public_id))
                .collect(),
            limit,
            offset,
        })
    }

    pub async fn get(&self, message_id: &str, user_id: i64) -> MessagingResult<MessageView> {
        let mut conn = self.ctx.pool().acquire().await?;
        let (conversation, message) =
            Self::locate(&mut conn, message_id, user_id, |_| Action::Read).await?;

        Self::render(&mut conn, &conversation, message.id).await
    }

    /// Find a message in an active conversation and authorize the caller
    /// against it.
    async fn locate(
        conn: &mut SqliteConnection,
        message_id: &str,
        user_id: i64,
        action: impl FnOnce(&Message) -> Action,
    ) -> MessagingResult<(Conversation, Message)> {
        let message = message_repository::find_by_public_id(conn, message_id)
            .await?
            .ok_or_else(|| MessagingError::not_found("message", message_id))?;
        let conversation = conversation_repository::find_by_id(conn, message.conversation_id)
            .await?
            .filter(|conversation| conversation.is_active)
            .ok_or_else(|| MessagingError::not_found("message", message_id))?;

        require_participant(conn, &conversation, user_id, &action(&message)).await?;
        Ok((conversation, message))
    }

    async fn render(
        conn: &mut SqliteConnection,
        conversation: &Conversation,
        id: i64,
    ) -> MessagingResult<MessageView> {
        let record = message_repository::find_record(conn, id)
            .await?
            .ok_or_else(|| MessagingError::not_found("message", id.to_string()))?;
        Ok(MessageView::from_record(&record, &conversation.public_id))
    }
}
