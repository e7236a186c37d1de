//! Invitation data access.

use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use tracing::info;

use crate::entities::{Invitation, InvitationStatus, NewInvitation};
use crate::types::{now_timestamp, DatabaseResult};

const INVITATION_COLUMNS: &str = "id, public_id, conversation_id, invited_by, invited_user_id, \
     invitee_employee_ref, status, message, expires_at, responded_at, created_at";

fn invitation_from_row(row: &SqliteRow) -> DatabaseResult<Invitation> {
    let status: String = row.try_get("status")?;

    Ok(Invitation {
        id: row.try_get("id")?,
        public_id: row.try_get("public_id")?,
        conversation_id: row.try_get("conversation_id")?,
        invited_by: row.try_get("invited_by")?,
        invited_user_id: row.try_get("invited_user_id")?,
        invitee_employee_ref: row.try_get("invitee_employee_ref")?,
        status: status.parse()?,
        message: row.try_get("message")?,
        expires_at: row.try_get("expires_at")?,
        responded_at: row.try_get("responded_at")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Insert a pending invitation. A second pending invitation for the same
/// invitee surfaces as [`crate::DatabaseError::Duplicate`].
pub async fn insert(
    conn: &mut SqliteConnection,
    request: &NewInvitation,
) -> DatabaseResult<Invitation> {
    let now = now_timestamp();
    let public_id = cuid2::create_id();

    let id = sqlx::query(
        r#"
        INSERT INTO invitations
            (public_id, conversation_id, invited_by, invited_user_id, invitee_employee_ref,
             status, message, expires_at, created_at)
        VALUES (?, ?, ?, ?, ?, 'pending', ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(request.conversation_id)
    .bind(request.invited_by)
    .bind(request.invited_user_id)
    .bind(&request.invitee_employee_ref)
    .bind(request.message.as_deref())
    .bind(request.expires_at.as_deref())
    .bind(&now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    info!(
        invitation_id = %public_id,
        conversation_id = request.conversation_id,
        invited_user_id = request.invited_user_id,
        "created invitation"
    );

    Ok(Invitation {
        id,
        public_id,
        conversation_id: request.conversation_id,
        invited_by: request.invited_by,
        invited_user_id: request.invited_user_id,
        invitee_employee_ref: request.invitee_employee_ref.clone(),
        status: InvitationStatus::Pending,
        message: request.message.clone(),
        expires_at: request.expires_at.clone(),
        responded_at: None,
        created_at: now,
    })
}

pub async fn find_by_public_id(
    conn: &mut SqliteConnection,
    public_id: &str,
) -> DatabaseResult<Option<Invitation>> {
    let row = sqlx::query(&format!(
        "SELECT {INVITATION_COLUMNS} FROM invitations WHERE public_id = ?"
    ))
    .bind(public_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(invitation_from_row).transpose()
}

pub async fn find_pending(
    conn: &mut SqliteConnection,
    conversation_id: i64,
    invited_user_id: i64,
) -> DatabaseResult<Option<Invitation>> {
    let row = sqlx::query(&format!(
        "SELECT {INVITATION_COLUMNS} FROM invitations
         WHERE conversation_id = ? AND invited_user_id = ? AND status = 'pending'"
    ))
    .bind(conversation_id)
    .bind(invited_user_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(invitation_from_row).transpose()
}

/// Resolve a pending invitation into a terminal status. Returns `None` when
/// the invitation was no longer pending, so a concurrent response wins once.
pub async fn resolve(
    conn: &mut SqliteConnection,
    id: i64,
    status: InvitationStatus,
) -> DatabaseResult<Option<Invitation>> {
    let now = now_timestamp();

    let row = sqlx::query(&format!(
        r#"
        UPDATE invitations
        SET status = ?, responded_at = ?
        WHERE id = ? AND status = 'pending'
        RETURNING {INVITATION_COLUMNS}
        "#
    ))
    .bind(status.as_str())
    .bind(&now)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let invitation = row.as_ref().map(invitation_from_row).transpose()?;
    if let Some(invitation) = &invitation {
        info!(
            invitation_id = %invitation.public_id,
            status = %invitation.status,
            "resolved invitation"
        );
    }
    Ok(invitation)
}

pub async fn list_for_user(
    conn: &mut SqliteConnection,
    invited_user_id: i64,
    status: Option<InvitationStatus>,
) -> DatabaseResult<Vec<Invitation>> {
    let rows = sqlx::query(&format!(
        "SELECT {INVITATION_COLUMNS} FROM invitations
         WHERE invited_user_id = ? AND (? IS NULL OR status = ?)
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(invited_user_id)
    .bind(status.map(|s| s.as_str()))
    .bind(status.map(|s| s.as_str()))
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(invitation_from_row).collect()
}

pub async fn list_for_conversation(
    conn: &mut SqliteConnection,
    conversation_id: i64,
    status: Option<InvitationStatus>,
) -> DatabaseResult<Vec<Invitation>> {
    let rows = sqlx::query(&format!(
        "SELECT {INVITATION_COLUMNS} FROM invitations
         WHERE conversation_id = ? AND (? IS NULL OR status = ?)
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(conversation_id)
    .bind(status.map(|s| s.as_str()))
    .bind(status.map(|s| s.as_str()))
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(invitation_from_row).collect()
}
