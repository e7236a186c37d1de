//! Invitations into existing conversations.
//!
//! Expiry is lazy: nothing sweeps lapsed invitations. A pending invitation
//! whose `expires_at` has passed reads as `expired`, and the status is
//! written back the first time someone tries to act on it.

use chrono::{Duration, Utc};
use relay_database::{
    conversation_repository, format_timestamp, invitation_repository, normalize_timestamp,
    now_timestamp, participant_repository, Conversation, Invitation, InvitationStatus,
    NewInvitation, ParticipantRole,
};
use sqlx::SqliteConnection;
use std::collections::HashMap;
use tracing::info;

use super::{admit, load_conversation, require_participant, MessagingContext};
use crate::types::{
    CreateInvitationRequest, InvitationFilter, InvitationView, MessagingError, MessagingEvent,
    MessagingResult,
};
use crate::utils::validation::Validator;
use crate::utils::Action;

#[derive(Clone)]
pub struct InvitationWorkflow {
    ctx: MessagingContext,
}

impl InvitationWorkflow {
    pub fn new(ctx: MessagingContext) -> Self {
        Self { ctx }
    }

    /// Invite an employee who is not currently in the conversation. Only
    /// admins and owners may invite, and a user holds at most one pending
    /// invitation per conversation.
    pub async fn create(
        &self,
        conversation_id: &str,
        inviter_id: i64,
        request: CreateInvitationRequest,
    ) -> MessagingResult<InvitationView> {
        let message = Validator::invitation_message(request.message.as_deref())?;
        let now = now_timestamp();
        let expires_at = self.expiry_for(&request, &now)?;
        let invited_user_id = request.invited_user_id;

        let conversation = {
            let mut conn = self.ctx.pool().acquire().await?;
            let conversation = load_conversation(&mut conn, conversation_id).await?;
            require_participant(&mut conn, &conversation, inviter_id, &Action::Invite).await?;

            if participant_repository::find_active(&mut conn, conversation.id, invited_user_id)
                .await?
                .is_some()
            {
                return Err(MessagingError::AlreadyParticipant {
                    user_id: invited_user_id,
                });
            }
            conversation
        };

        let invitee_employee_ref = self
            .ctx
            .directory()
            .require_participant(conversation.business_id, invited_user_id)
            .await?;

        let mut conn = self.ctx.pool().acquire().await?;
        if let Some(pending) =
            invitation_repository::find_pending(&mut conn, conversation.id, invited_user_id).await?
        {
            if !pending.is_expired_at(&now) {
                return Err(MessagingError::DuplicateInvitation {
                    user_id: invited_user_id,
                });
            }
            self.expire(&mut conn, &pending, &conversation.public_id)
                .await?;
        }

        let inserted = invitation_repository::insert(
            &mut conn,
            &NewInvitation {
                conversation_id: conversation.id,
                invited_by: inviter_id,
                invited_user_id,
                invitee_employee_ref,
                message,
                expires_at,
            },
        )
        .await;
        let invitation = match inserted {
            Ok(invitation) => invitation,
            Err(err) if err.is_duplicate_on("invitations") => {
                return Err(MessagingError::DuplicateInvitation {
                    user_id: invited_user_id,
                })
            }
            Err(err) => return Err(err.into()),
        };

        self.ctx.publish(MessagingEvent::InvitationCreated {
            invitation_id: invitation.public_id.clone(),
            conversation_id: conversation.public_id.clone(),
            invited_by: inviter_id,
            invited_user_id,
        });

        Ok(InvitationView::new(&invitation, &conversation.public_id, &now))
    }

    /// Accept a pending invitation. The invitee joins as a member; a former
    /// participant is reactivated rather than duplicated.
    pub async fn accept(
        &self,
        invitation_id: &str,
        user_id: i64,
    ) -> MessagingResult<InvitationView> {
        let (invitation, conversation) = self.respondable(invitation_id, user_id).await?;

        let mut tx = self.ctx.pool().begin().await?;
        let accepted =
            invitation_repository::resolve(&mut *tx, invitation.id, InvitationStatus::Accepted)
                .await?
                .ok_or_else(|| MessagingError::invalid_state("invitation is no longer pending"))?;
        admit(
            &mut *tx,
            conversation.id,
            user_id,
            &invitation.invitee_employee_ref,
            ParticipantRole::Member,
        )
        .await?;
        tx.commit().await?;

        info!(
            invitation_id,
            conversation_id = %conversation.public_id,
            user_id,
            "invitation accepted"
        );
        self.publish_status(&accepted, &conversation.public_id);

        Ok(InvitationView::new(&accepted, &conversation.public_id, &now_timestamp()))
    }

    pub async fn decline(
        &self,
        invitation_id: &str,
        user_id: i64,
    ) -> MessagingResult<InvitationView> {
        let (invitation, conversation) = self.respondable(invitation_id, user_id).await?;

        let mut conn = self.ctx.pool().acquire().await?;
        let declined =
            invitation_repository::resolve(&mut conn, invitation.id, InvitationStatus::Declined)
                .await?
                .ok_or_else(|| MessagingError::invalid_state("invitation is no longer pending"))?;

        info!(
            invitation_id,
            conversation_id = %conversation.public_id,
            user_id,
            "invitation declined"
        );
        self.publish_status(&declined, &conversation.public_id);

        Ok(InvitationView::new(&declined, &conversation.public_id, &now_timestamp()))
    }

    /// An invitation as seen by its invitee or by an admin of its conversation.
    pub async fn get(&self, invitation_id: &str, user_id: i64) -> MessagingResult<InvitationView> {
        let mut conn = self.ctx.pool().acquire().await?;
        let invitation = invitation_repository::find_by_public_id(&mut conn, invitation_id)
            .await?
            .ok_or_else(|| MessagingError::not_found("invitation", invitation_id))?;
        let conversation_id = invitation.conversation_id;
        let conversation = conversation_repository::find_by_id(&mut conn, conversation_id)
            .await?
            .ok_or_else(|| MessagingError::not_found("invitation", invitation_id))?;

        if invitation.invited_user_id != user_id {
            require_participant(&mut conn, &conversation, user_id, &Action::Invite).await?;
        }

        Ok(InvitationView::new(&invitation, &conversation.public_id, &now_timestamp()))
    }

    /// Invitations addressed to the user, newest first, filtered on their
    /// effective status.
    pub async fn list_for_user(
        &self,
        user_id: i64,
        filter: InvitationFilter,
    ) -> MessagingResult<Vec<InvitationView>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let invitations = invitation_repository::list_for_user(&mut conn, user_id, None).await?;

        let now = now_timestamp();
        let mut public_ids: HashMap<i64, String> = HashMap::new();
        let mut views = Vec::with_capacity(invitations.len());
        for invitation in invitations {
            if filter
                .status
                .is_some_and(|status| invitation.effective_status(&now) != status)
            {
                continue;
            }
            let conversation_id = match public_ids.get(&invitation.conversation_id) {
                Some(public_id) => public_id.clone(),
                None => {
                    let Some(conversation) =
                        conversation_repository::find_by_id(&mut conn, invitation.conversation_id)
                            .await?
                    else {
                        continue;
                    };
                    public_ids.insert(conversation.id, conversation.public_id.clone());
                    conversation.public_id
                }
            };
            views.push(InvitationView::new(&invitation, &conversation_id, &now));
        }

        Ok(views)
    }

    /// Invitations of one conversation, for its admins.
    pub async fn list_for_conversation(
        &self,
        conversation_id: &str,
        user_id: i64,
        filter: InvitationFilter,
    ) -> MessagingResult<Vec<InvitationView>> {
        let mut conn = self.ctx.pool().acquire().await?;
        let conversation = load_conversation(&mut conn, conversation_id).await?;
        require_participant(&mut conn, &conversation, user_id, &Action::Invite).await?;

        let now = now_timestamp();
        let invitations =
            invitation_repository::list_for_conversation(&mut conn, conversation.id, None).await?;

        Ok(invitations
            .iter()
            .filter(|invitation| {
                filter
                    .status
                    .map_or(true, |status| invitation.effective_status(&now) == status)
            })
            .map(|invitation| InvitationView::new(invitation, &conversation.public_id, &now))
            .collect())
    }

    /// Load an invitation the caller may still answer. A lapsed invitation
    /// is marked expired on the way out.
    async fn respondable(
        &self,
        invitation_id: &str,
        user_id: i64,
    ) -> MessagingResult<(Invitation, Conversation)> {
        let mut conn = self.ctx.pool().acquire().await?;
        let invitation = invitation_repository::find_by_public_id(&mut conn, invitation_id)
            .await?
            .ok_or_else(|| MessagingError::not_found("invitation", invitation_id))?;

        if invitation.invited_user_id != user_id {
            return Err(MessagingError::forbidden(
                "invitation is addressed to another user",
            ));
        }
        if invitation.status.is_final() {
            return Err(MessagingError::invalid_state(format!(
                "invitation is already {}",
                invitation.status
            )));
        }

        let conversation_id = invitation.conversation_id;
        let conversation = conversation_repository::find_by_id(&mut conn, conversation_id)
            .await?
            .ok_or_else(|| MessagingError::not_found("conversation", conversation_id.to_string()))?;

        if invitation.is_expired_at(&now_timestamp()) {
            self.expire(&mut conn, &invitation, &conversation.public_id)
                .await?;
            return Err(MessagingError::invalid_state("invitation has expired"));
        }
        if !conversation.is_active {
            return Err(MessagingError::not_found("conversation", &conversation.public_id));
        }

        Ok((invitation, conversation))
    }

    async fn expire(
        &self,
        conn: &mut SqliteConnection,
        invitation: &Invitation,
        conversation_id: &str,
    ) -> MessagingResult<()> {
        if let Some(expired) =
            invitation_repository::resolve(conn, invitation.id, InvitationStatus::Expired).await?
        {
            self.publish_status(&expired, conversation_id);
        }
        Ok(())
    }

    fn publish_status(&self, invitation: &Invitation, conversation_id: &str) {
        self.ctx.publish(MessagingEvent::InvitationStatusChanged {
            invitation_id: invitation.public_id.clone(),
            conversation_id: conversation_id.to_string(),
            invited_by: invitation.invited_by,
            invited_user_id: invitation.invited_user_id,
            status: invitation.status,
        });
    }

    /// Explicit `expires_at` wins, then `expires_in_hours`, then the
    /// configured default. A default of zero means no expiry.
    fn expiry_for(
        &self,
        request: &CreateInvitationRequest,
        now: &str,
    ) -> MessagingResult<Option<String>> {
        if let Some(raw) = request.expires_at.as_deref() {
            let expires_at = normalize_timestamp(raw).map_err(|_| {
                MessagingError::validation("expires_at must be an RFC 3339 timestamp")
            })?;
            if expires_at.as_str() <= now {
                return Err(MessagingError::validation("expires_at must be in the future"));
            }
            return Ok(Some(expires_at));
        }

        let hours = match request.expires_in_hours {
            Some(hours) if hours <= 0 => {
                return Err(MessagingError::validation("expires_in_hours must be positive"))
            }
            Some(hours) => hours,
            None => match self.ctx.settings().default_invitation_ttl_hours {
                0 => return Ok(None),
                hours => i64::try_from(hours)
                    .map_err(|_| MessagingError::validation("invitation ttl out of range"))?,
            },
        };

        Duration::try_hours(hours)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .map(|at| Some(format_timestamp(at)))
            .ok_or_else(|| MessagingError::validation("invitation expiry out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::{test_core, TestCore, BUSINESS};
    use crate::types::{CreateConversationRequest, ErrorKind};
    use relay_database::ConversationType;

    async fn group(tc: &TestCore) -> String {
        tc.core
            .conversations
            .create(
                1,
                CreateConversationRequest {
                    business_id: BUSINESS,
                    conversation_type: ConversationType::Group,
                    title: Some("Board".to_string()),
                    participant_ids: vec![2],
                },
            )
            .await
            .unwrap()
            .conversation
            .id
    }

    fn invite(user_id: i64) -> CreateInvitationRequest {
        CreateInvitationRequest {
            invited_user_id: user_id,
            ..CreateInvitationRequest::default()
        }
    }

    #[tokio::test]
    async fn default_ttl_applies() {
        let tc = test_core().await;
        let id = group(&tc).await;

        let invitation = tc.core.invitations.create(&id, 1, invite(5)).await.unwrap();
        assert_eq!(invitation.status, InvitationStatus::Pending);
        assert!(invitation.expires_at.unwrap() > invitation.created_at);
    }

    #[tokio::test]
    async fn create_guards() {
        let tc = test_core().await;
        let id = group(&tc).await;

        let err = tc
            .core
            .invitations
            .create(&id, 2, invite(5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let err = tc
            .core
            .invitations
            .create(&id, 1, invite(2))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyParticipant);

        let err = tc
            .core
            .invitations
            .create(&id, 1, invite(77))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParticipant);

        let err = tc
            .core
            .invitations
            .create(
                &id,
                1,
                CreateInvitationRequest {
                    expires_at: Some("2000-01-01T00:00:00Z".to_string()),
                    ..invite(5)
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        tc.core.invitations.create(&id, 1, invite(5)).await.unwrap();
        let err = tc
            .core
            .invitations
            .create(&id, 1, invite(5))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateInvitation);
    }

    #[tokio::test]
    async fn only_invitee_answers_and_only_once() {
        let tc = test_core().await;
        let id = group(&tc).await;
        let invitation = tc.core.invitations.create(&id, 1, invite(5)).await.unwrap();

        let err = tc
            .core
            .invitations
            .accept(&invitation.id, 6)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let declined = tc
            .core
            .invitations
            .decline(&invitation.id, 5)
            .await
            .unwrap();
        assert_eq!(declined.status, InvitationStatus::Declined);

        let err = tc
            .core
            .invitations
            .accept(&invitation.id, 5)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let again = tc.core.invitations.create(&id, 1, invite(5)).await.unwrap();
        assert_ne!(again.id, invitation.id);
    }

    #[tokio::test]
    async fn lapsed_invitation_reads_expired_and_persists_on_touch() {
        let tc = test_core().await;
        let id = group(&tc).await;
        let invitation = tc.core.invitations.create(&id, 1, invite(5)).await.unwrap();

        sqlx::query("UPDATE invitations SET expires_at = ? WHERE public_id = ?")
            .bind("2000-01-01T00:00:00.000000Z")
            .bind(&invitation.id)
            .execute(&tc.pool)
            .await
            .unwrap();

        let listed = tc
            .core
            .invitations
            .list_for_user(
                5,
                InvitationFilter {
                    status: Some(InvitationStatus::Expired),
                },
            )
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let err = tc
            .core
            .invitations
            .accept(&invitation.id, 5)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let stored: String =
            sqlx::query_scalar("SELECT status FROM invitations WHERE public_id = ?")
                .bind(&invitation.id)
                .fetch_one(&tc.pool)
                .await
                .unwrap();
        assert_eq!(stored, "expired");

        let replacement = tc.core.invitations.create(&id, 1, invite(5)).await.unwrap();
        assert_eq!(replacement.status, InvitationStatus::Pending);
    }

    #[tokio::test]
    async fn listings_respect_roles() {
        let tc = test_core().await;
        let id = group(&tc).await;
        let invitation = tc.core.invitations.create(&id, 1, invite(5)).await.unwrap();

        let err = tc
            .core
            .invitations
            .list_for_conversation(&id, 2, InvitationFilter::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let listed = tc
            .core
            .invitations
            .list_for_conversation(&id, 1, InvitationFilter::default())
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        assert_eq!(tc.core.invitations.get(&invitation.id, 5).await.unwrap().id, invitation.id);
        let err = tc
            .core
            .invitations
            .get(&invitation.id, 2)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
    }
}
