//! Conversation lifecycle and membership.

use relay_database::{
    conversation_repository, message_repository, now_timestamp, participant_repository,
    ConversationType, DeliveryStatus, NewConversation, NewParticipant, ParticipantRole,
};
use tracing::info;

use super::{
    admit, dedupe, load_conversation, require_participant, resolve_message_ids,
    DeliveryTracker, MessagingContext, UnreadCounter,
};
use crate::types::{
    AddParticipantsOutcome, ConversationDetail, ConversationFilter, ConversationSummary,
    ConversationView, CreateConversationRequest, MessagePreview, MessageSelection,
    MessagingError, MessagingEvent, MessagingResult, ParticipantView, ReadOutcome,
};
use crate::utils::validation::Validator;
use crate::utils::{authorize, Action};

/// Creates conversations and manages who is in them.
#[derive(Clone)]
pub struct ConversationRegistry {
    ctx: MessagingContext,
}

impl ConversationRegistry {
    pub fn new(ctx: MessagingContext) -> Self {
        Self { ctx }
    }

    /// Open a conversation. The creator becomes admin of a group
    /// conversation and a plain member of any other type. Every
    /// participant is checked against the employee directory before anything
    /// is written.
    pub async fn create(
        &self,
        creator_id: i64,
        request: CreateConversationRequest,
    ) -> MessagingResult<ConversationDetail> {
        let recipients = dedupe(
            request
                .participant_ids
                .iter()
                .copied()
                .filter(|&user_id| user_id != creator_id),
        );
        if recipients.is_empty() {
            return Err(MessagingError::EmptyParticipants);
        }
        if request.conversation_type == ConversationType::Direct && recipients.len() != 1 {
            return Err(MessagingError::validation(
                "direct conversations have exactly one other participant",
            ));
        }
        let title = Validator::conversation_title(request.title.as_deref())?;

        let directory = self.ctx.directory();
        let creator_ref = directory
            .require_actor(request.business_id, creator_id)
            .await?;
        let resolved = directory
            .require_participants(request.business_id, &recipients)
            .await?;

        let creator_role = match request.conversation_type {
            ConversationType::Group => ParticipantRole::Admin,
            ConversationType::Direct | ConversationType::BusinessWide => ParticipantRole::Member,
        };

        let mut tx = self.ctx.pool().begin().await?;
        let conversation = conversation_repository::insert(
            &mut *tx,
            &NewConversation {
                business_id: request.business_id,
                conversation_type: request.conversation_type,
                title,
                created_by: creator_id,
            },
        )
        .await?;

        let mut participants = Vec::with_capacity(resolved.len() + 1);
        participants.push(
            participant_repository::insert(
                &mut *tx,
                &NewParticipant {
                    conversation_id: conversation.id,
                    user_id: creator_id,
                    employee_ref: creator_ref,
                    role: creator_role,
                },
            )
            .await?,
        );
        for (user_id, employee_ref) in resolved {
            participants.push(
                participant_repository::insert(
                    &mut *tx,
                    &NewParticipant {
                        conversation_id: conversation.id,
                        user_id,
                        employee_ref,
                        role: ParticipantRole::Member,
                    },
                )
                .await?,
            );
        }
        tx.commit().await?;

        info!(
            conversation_id = %conversation.public_id,
            business_id = conversation.business_id,
            conversation_type = %conversation.conversation_type,
            participants = participants.len(),
            "created conversation"
        );

        self.ctx.publish(MessagingEvent::ConversationCreated {
            conversation_id: conversation.public_id.clone(),
            business_id: conversation.business_id,
            created_by: creator_id,
            participant_ids: participants.iter().map(|p| p.user_id).collect(),
        });

        Ok(ConversationDetail {
            conversation: ConversationView::from(&conversation),
            role: creator_role,
            is_muted: false,
            unread_count: 0,
            participants: participants.iter().map(ParticipantView::from).collect(),
        })
    }

    /// Conversation details as seen by one of its participants.
    pub async fn get(
        &self,
        conversation_id: &str,
        user_id: i64,
    ) -> MessagingResult<ConversationDetail> {
        let mut conn = self.ctx.pool().acquire().await?;
        let conversation = load_conversation(&mut conn, conversation_id).await?;
        let participant =
            require_participant(&mut conn, &conversation, user_id, &Action::Read).await?;

        let participants = participant_repository::list_active(&mut conn, conversation.id).await?;
        let unread_count = UnreadCounter::count_for(&mut conn, &participant).await?;

        Ok(ConversationDetail {
            conversation: ConversationView::from(&conversation),
            role: participant.role,
            is_muted: participant.is_muted,
            unread_count,
            participants: participants.iter().map(ParticipantView::from).collect(),
        })
    }

    /// Active conversations the user is in, most recently active first.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        filter: ConversationFilter,
    ) -> MessagingResult<Vec<ConversationSummary>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let listings = conversation_repository::list_for_user(
            &mut conn,
            user_id,
            filter.business_id,
            filter.conversation_type,
        )
        .await?;

        let mut summaries = Vec::with_capacity(listings.len());
        for listing in listings {
            let last_message =
                message_repository::latest_visible(&mut conn, listing.conversation.id).await?;
            summaries.push(ConversationSummary {
                conversation: ConversationView::from(&listing.conversation),
                role: listing.role,
                is_muted: listing.is_muted,
                unread_count: listing.unread_count,
                last_message: last_message.as_ref().map(MessagePreview::from),
            });
        }

        Ok(summaries)
    }

    /// Add employees to a conversation. Users who are already active are
    /// reported back rather than rejected, so repeating a call is harmless.
    pub async fn add_participants(
        &self,
        conversation_id: &str,
        requester_id: i64,
        user_ids: Vec<i64>,
    ) -> MessagingResult<AddParticipantsOutcome> {
        let targets = dedupe(user_ids);
        if targets.is_empty() {
            return Err(MessagingError::EmptyParticipants);
        }

        let (conversation, mut outcome, candidates) = {
            let mut conn = self.ctx.pool().acquire().await?;
            let conversation = load_conversation(&mut conn, conversation_id).await?;
            require_participant(
                &mut conn,
                &conversation,
                requester_id,
                &Action::ManageParticipants,
            )
            .await?;

            let mut outcome = AddParticipantsOutcome::default();
            let mut candidates = Vec::new();
            for user_id in targets {
                if participant_repository::find_active(&mut conn, conversation.id, user_id)
                    .await?
                    .is_some()
                {
                    outcome.already_active.push(user_id);
                } else {
                    candidates.push(user_id);
                }
            }
            (conversation, outcome, candidates)
        };

        if candidates.is_empty() {
            return Ok(outcome);
        }

        let resolved = self
            .ctx
            .directory()
            .require_participants(conversation.business_id, &candidates)
            .await?;

        let mut tx = self.ctx.pool().begin().await?;
        for (user_id, employee_ref) in resolved {
            match admit(
                &mut *tx,
                conversation.id,
                user_id,
                &employee_ref,
                ParticipantRole::Member,
            )
            .await?
            {
                Some(_) => outcome.added.push(user_id),
                None => outcome.already_active.push(user_id),
            }
        }
        tx.commit().await?;

        info!(
            conversation_id,
            requester_id,
            added = outcome.added.len(),
            already_active = outcome.already_active.len(),
            "added participants"
        );

        if !outcome.added.is_empty() {
            self.ctx.publish(MessagingEvent::ParticipantsAdded {
                conversation_id: conversation.public_id.clone(),
                added_by: requester_id,
                user_ids: outcome.added.clone(),
            });
        }

        Ok(outcome)
    }

    /// Deactivate the caller's membership. History and receipts are kept.
    pub async fn leave(&self, conversation_id: &str, user_id: i64) -> MessagingResult<()> {
        let mut conn = self.ctx.pool().acquire().await?;
        let conversation = load_conversation(&mut conn, conversation_id).await?;
        let participant = participant_repository::find_active(&mut conn, conversation.id, user_id)
            .await?
            .ok_or_else(|| MessagingError::not_a_participant(conversation_id, user_id))?;

        if !participant_repository::deactivate(&mut conn, participant.id).await? {
            return Err(MessagingError::not_a_participant(conversation_id, user_id));
        }

        info!(conversation_id, user_id, "participant left conversation");
        self.ctx.publish(MessagingEvent::ParticipantLeft {
            conversation_id: conversation.public_id,
            user_id,
        });
        Ok(())
    }

    /// Move the caller's read cursor to now and mark receipts `read`, either
    /// for every message or for the selected ones.
    pub async fn mark_read(
        &self,
        conversation_id: &str,
        user_id: i64,
        selection: MessageSelection,
    ) -> MessagingResult<ReadOutcome> {
        let (participant, message_ids) = {
            let mut conn = self.ctx.pool().acquire().await?;
            let conversation = load_conversation(&mut conn, conversation_id).await?;
            let participant =
                require_participant(&mut conn, &conversation, user_id, &Action::Acknowledge)
                    .await?;
            let message_ids = match &selection {
                MessageSelection::All => None,
                MessageSelection::Only(ids) => {
                    Some(resolve_message_ids(&mut conn, &conversation, ids).await?)
                }
            };
            (participant, message_ids)
        };

        let mut tx = self.ctx.pool().begin().await?;
        conversation_repository::lock_for_write(&mut *tx, participant.conversation_id).await?;
        let now = now_timestamp();
        let last_read_at =
            participant_repository::advance_read_cursor(&mut *tx, participant.id, &now).await?;
        let updated = DeliveryTracker::advance(
            &mut *tx,
            &participant,
            message_ids.as_deref(),
            DeliveryStatus::Read,
            &now,
        )
        .await?;
        tx.commit().await?;

        info!(conversation_id, user_id, updated, "marked conversation read");
        Ok(ReadOutcome {
            last_read_at,
            updated,
        })
    }

    /// Active participants, in join order.
    pub async fn participants(
        &self,
        conversation_id: &str,
        user_id: i64,
    ) -> MessagingResult<Vec<ParticipantView>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let conversation = load_conversation(&mut conn, conversation_id).await?;
        require_participant(&mut conn, &conversation, user_id, &Action::Read).await?;

        let participants = participant_repository::list_active(&mut conn, conversation.id).await?;
        Ok(participants.iter().map(ParticipantView::from).collect())
    }

    pub async fn set_muted(
        &self,
        conversation_id: &str,
        user_id: i64,
        muted: bool,
    ) -> MessagingResult<ParticipantView> {
        let mut conn = self.ctx.pool().acquire().await?;
        let conversation = load_conversation(&mut conn, conversation_id).await?;
        let mut participant =
            require_participant(&mut conn, &conversation, user_id, &Action::Mute).await?;

        participant_repository::set_muted(&mut conn, participant.id, muted).await?;
        participant.is_muted = muted;

        Ok(ParticipantView::from(&participant))
    }

    /// Change another participant's role. Admins manage members and admins;
    /// granting or revoking `owner` takes an owner.
    pub async fn change_role(
        &self,
        conversation_id: &str,
        requester_id: i64,
        target_user_id: i64,
        role: ParticipantRole,
    ) -> MessagingResult<ParticipantView> {
        let mut conn = self.ctx.pool().acquire().await?;
        let conversation = load_conversation(&mut conn, conversation_id).await?;
        let requester = require_participant(
            &mut conn,
            &conversation,
            requester_id,
            &Action::ManageParticipants,
        )
        .await?;

        let mut target =
            participant_repository::find_active(&mut conn, conversation.id, target_user_id)
                .await?
                .ok_or_else(|| {
                    MessagingError::not_found("participant", target_user_id.to_string())
                })?;

        authorize(
            Some(&requester),
            &conversation,
            requester_id,
            &Action::ChangeRole {
                target_user_id,
                current: target.role,
                requested: role,
            },
        )?;

        if target.role != role {
            participant_repository::set_role(&mut conn, target.id, role).await?;
            target.role = role;

            self.ctx.publish(MessagingEvent::ParticipantRoleChanged {
                conversation_id: conversation.public_id.clone(),
                user_id: target_user_id,
                role,
                changed_by: requester_id,
            });
        }

        Ok(ParticipantView::from(&target))
    }

    /// Close a conversation. It disappears from listings and stops accepting
    /// messages, invitations and membership changes.
    pub async fn deactivate(
        &self,
        conversation_id: &str,
        user_id: i64,
    ) -> MessagingResult<ConversationView> {
        let mut conn = self.ctx.pool().acquire().await?;
        let mut conversation = load_conversation(&mut conn, conversation_id).await?;
        require_participant(&mut conn, &conversation, user_id, &Action::Deactivate).await?;

        if !conversation_repository::deactivate(&mut conn, conversation.id).await? {
            return Err(MessagingError::not_found("conversation", conversation_id));
        }
        conversation.is_active = false;

        info!(conversation_id, user_id, "deactivated conversation");
        Ok(ConversationView::from(&conversation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::{test_core, BUSINESS};
    use crate::types::{AppendMessageRequest, ErrorKind};

    fn group(participant_ids: Vec<i64>) -> CreateConversationRequest {
        CreateConversationRequest {
            business_id: BUSINESS,
            conversation_type: ConversationType::Group,
            title: Some("Launch".to_string()),
            participant_ids,
        }
    }

    #[tokio::test]
    async fn creator_role_depends_on_type() {
        let tc = test_core().await;

        let group = tc
            .core
            .conversations
            .create(1, group(vec![2, 3]))
            .await
            .unwrap();
        assert_eq!(group.role, ParticipantRole::Admin);
        assert_eq!(group.participants.len(), 3);

        let direct = tc
            .core
            .conversations
            .create(
                1,
                CreateConversationRequest {
                    business_id: BUSINESS,
                    conversation_type: ConversationType::Direct,
                    title: None,
                    participant_ids: vec![2],
                },
            )
            .await
            .unwrap();
        assert_eq!(direct.role, ParticipantRole::Member);

        let everyone = tc
            .core
            .conversations
            .create(
                1,
                CreateConversationRequest {
                    business_id: BUSINESS,
                    conversation_type: ConversationType::BusinessWide,
                    title: Some("All hands".to_string()),
                    participant_ids: vec![2, 3, 4],
                },
            )
            .await
            .unwrap();
        assert_eq!(everyone.role, ParticipantRole::Member);
    }

    #[tokio::test]
    async fn create_rejects_bad_participant_lists() {
        let tc = test_core().await;

        let err = tc
            .core
            .conversations
            .create(1, group(vec![1, 1]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyParticipants);

        let err = tc
            .core
            .conversations
            .create(
                1,
                CreateConversationRequest {
                    business_id: BUSINESS,
                    conversation_type: ConversationType::Direct,
                    title: None,
                    participant_ids: vec![2, 3],
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = tc
            .core
            .conversations
            .create(42, group(vec![2]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn add_participants_is_idempotent() {
        let mut tc = test_core().await;
        let detail = tc
            .core
            .conversations
            .create(1, group(vec![2]))
            .await
            .unwrap();
        let id = detail.conversation.id;
        tc.drain_events();

        let first = tc
            .core
            .conversations
            .add_participants(&id, 1, vec![3, 4, 3])
            .await
            .unwrap();
        assert_eq!(first.added, vec![3, 4]);
        assert!(first.already_active.is_empty());

        let second = tc
            .core
            .conversations
            .add_participants(&id, 1, vec![3, 4])
            .await
            .unwrap();
        assert!(second.added.is_empty());
        assert_eq!(second.already_active, vec![3, 4]);

        let events = tc.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(tc.core.conversations.participants(&id, 1).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn members_cannot_add_participants() {
        let tc = test_core().await;
        let detail = tc
            .core
            .conversations
            .create(1, group(vec![2]))
            .await
            .unwrap();

        let err = tc
            .core
            .conversations
            .add_participants(&detail.conversation.id, 2, vec![3])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn former_employees_cannot_be_added() {
        let tc = test_core().await;
        let detail = tc
            .core
            .conversations
            .create(1, group(vec![2]))
            .await
            .unwrap();
        tc.directory.remove(BUSINESS, 3);

        let err = tc
            .core
            .conversations
            .add_participants(&detail.conversation.id, 1, vec![3])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParticipant);
        assert_eq!(
            tc.core
                .conversations
                .participants(&detail.conversation.id, 1)
                .await
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn rejoining_keeps_read_cursor() {
        let tc = test_core().await;
        let detail = tc
            .core
            .conversations
            .create(1, group(vec![2]))
            .await
            .unwrap();
        let id = detail.conversation.id;

        tc.core
            .messages
            .append(&id, 1, AppendMessageRequest::text("hi"))
            .await
            .unwrap();
        let read = tc
            .core
            .conversations
            .mark_read(&id, 2, MessageSelection::All)
            .await
            .unwrap();
        tc.core.conversations.leave(&id, 2).await.unwrap();

        let err = tc.core.conversations.leave(&id, 2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotAParticipant);

        let outcome = tc
            .core
            .conversations
            .add_participants(&id, 1, vec![2])
            .await
            .unwrap();
        assert_eq!(outcome.added, vec![2]);

        let rejoined = tc
            .core
            .conversations
            .participants(&id, 2)
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.user_id == 2)
            .unwrap();
        assert_eq!(rejoined.last_read_at, Some(read.last_read_at));
        assert_eq!(rejoined.role, ParticipantRole::Member);
    }

    #[tokio::test]
    async fn role_changes_follow_hierarchy() {
        let tc = test_core().await;
        let detail = tc
            .core
            .conversations
            .create(1, group(vec![2, 3]))
            .await
            .unwrap();
        let id = detail.conversation.id;

        let promoted = tc
            .core
            .conversations
            .change_role(&id, 1, 2, ParticipantRole::Admin)
            .await
            .unwrap();
        assert_eq!(promoted.role, ParticipantRole::Admin);

        let err = tc
            .core
            .conversations
            .change_role(&id, 2, 3, ParticipantRole::Owner)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = tc
            .core
            .conversations
            .change_role(&id, 1, 1, ParticipantRole::Member)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = tc
            .core
            .conversations
            .change_role(&id, 1, 9, ParticipantRole::Admin)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn deactivated_conversations_disappear() {
        let tc = test_core().await;
        let detail = tc
            .core
            .conversations
            .create(1, group(vec![2]))
            .await
            .unwrap();
        let id = detail.conversation.id;

        let err = tc.core.conversations.deactivate(&id, 2).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let view = tc.core.conversations.deactivate(&id, 1).await.unwrap();
        assert!(!view.is_active);

        assert!(tc
            .core
            .conversations
            .list_for_user(2, ConversationFilter::default())
            .await
            .unwrap()
            .is_empty());
        let err = tc
            .core
            .messages
            .append(&id, 1, AppendMessageRequest::text("anyone?"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn list_shows_last_visible_message_and_mute() {
        let tc = test_core().await;
        let detail = tc
            .core
            .conversations
            .create(1, group(vec![2]))
            .await
            .unwrap();
        let id = detail.conversation.id;

        let first = tc
            .core
            .messages
            .append(&id, 1, AppendMessageRequest::text("first"))
            .await
            .unwrap();
        let second = tc
            .core
            .messages
            .append(&id, 1, AppendMessageRequest::text("second"))
            .await
            .unwrap();
        tc.core.messages.soft_delete(&second.id, 1).await.unwrap();
        tc.core.conversations.set_muted(&id, 2, true).await.unwrap();

        let list = tc
            .core
            .conversations
            .list_for_user(2, ConversationFilter::default())
            .await
            .unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].is_muted);
        assert_eq!(list[0].unread_count, 1);
        assert_eq!(
            list[0].unread_count,
            tc.core.unread.unread_count(&id, 2).await.unwrap()
        );
        assert_eq!(list[0].last_message.as_ref().unwrap().id, first.id);
    }
}
