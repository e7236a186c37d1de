//! Unread counts derived from the read cursor.

use relay_database::{message_repository, Participant};
use sqlx::SqliteConnection;

use super::{load_conversation, require_participant, MessagingContext};
use crate::types::MessagingResult;
use crate::utils::Action;

/// Counts messages from others that are newer than the participant's
/// `last_read_at`. Nothing is stored; the count is recomputed on demand.
#[derive(Clone)]
pub struct UnreadCounter {
    ctx: MessagingContext,
}

impl UnreadCounter {
    pub fn new(ctx: MessagingContext) -> Self {
        Self { ctx }
    }

    /// Unread messages for a participant row. A participant who never read
    /// anything counts every non-deleted message from others.
    pub async fn count_for(
        conn: &mut SqliteConnection,
        participant: &Participant,
    ) -> MessagingResult<i64> {
        Ok(message_repository::count_unread(conn, participant.id).await?)
    }

    pub async fn unread_count(&self, conversation_id: &str, user_id: i64) -> MessagingResult<i64> {
        let mut conn = self.ctx.pool().acquire().await?;
        let conversation = load_conversation(&mut conn, conversation_id).await?;
        let participant =
            require_participant(&mut conn, &conversation, user_id, &Action::Read).await?;
        Self::count_for(&mut conn, &participant).await
    }
}
