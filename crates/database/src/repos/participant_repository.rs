//! Participant data access.

use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use tracing::info;

use crate::entities::{NewParticipant, Participant, ParticipantRole};
use crate::types::{now_timestamp, DatabaseError, DatabaseResult};

const PARTICIPANT_COLUMNS: &str = "id, conversation_id, user_id, employee_ref, role, joined_at, \
     last_read_at, is_muted, is_active";

fn participant_from_row(row: &SqliteRow) -> DatabaseResult<Participant> {
    let role: String = row.try_get("role")?;

    Ok(Participant {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        user_id: row.try_get("user_id")?,
        employee_ref: row.try_get("employee_ref")?,
        role: role.parse()?,
        joined_at: row.try_get("joined_at")?,
        last_read_at: row.try_get("last_read_at")?,
        is_muted: row.try_get("is_muted")?,
        is_active: row.try_get("is_active")?,
    })
}

/// Insert a new membership row. A second row for the same user surfaces as
/// [`DatabaseError::Duplicate`].
pub async fn insert(
    conn: &mut SqliteConnection,
    request: &NewParticipant,
) -> DatabaseResult<Participant> {
    let now = now_timestamp();

    let id = sqlx::query(
        r#"
        INSERT INTO participants
            (conversation_id, user_id, employee_ref, role, joined_at, is_muted, is_active)
        VALUES (?, ?, ?, ?, ?, 0, 1)
        "#,
    )
    .bind(request.conversation_id)
    .bind(request.user_id)
    .bind(&request.employee_ref)
    .bind(request.role.as_str())
    .bind(&now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    info!(
        participant_id = id,
        conversation_id = request.conversation_id,
        user_id = request.user_id,
        role = %request.role,
        "added participant to conversation"
    );

    Ok(Participant {
        id,
        conversation_id: request.conversation_id,
        user_id: request.user_id,
        employee_ref: request.employee_ref.clone(),
        role: request.role,
        joined_at: now,
        last_read_at: None,
        is_muted: false,
        is_active: true,
    })
}

/// Find the membership row for a user, active or not.
pub async fn find(
    conn: &mut SqliteConnection,
    conversation_id: i64,
    user_id: i64,
) -> DatabaseResult<Option<Participant>> {
    let row = sqlx::query(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM participants WHERE conversation_id = ? AND user_id = ?"
    ))
    .bind(conversation_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(participant_from_row).transpose()
}

pub async fn find_active(
    conn: &mut SqliteConnection,
    conversation_id: i64,
    user_id: i64,
) -> DatabaseResult<Option<Participant>> {
    Ok(find(conn, conversation_id, user_id)
        .await?
        .filter(|participant| participant.is_active))
}

pub async fn list_active(
    conn: &mut SqliteConnection,
    conversation_id: i64,
) -> DatabaseResult<Vec<Participant>> {
    let rows = sqlx::query(&format!(
        "SELECT {PARTICIPANT_COLUMNS} FROM participants
         WHERE conversation_id = ? AND is_active = 1
         ORDER BY joined_at ASC, id ASC"
    ))
    .bind(conversation_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(participant_from_row).collect()
}

/// Bring a participant who left back in with a fresh join time. The read
/// cursor is kept so history they already saw stays read.
pub async fn reactivate(
    conn: &mut SqliteConnection,
    id: i64,
    role: ParticipantRole,
    employee_ref: &str,
) -> DatabaseResult<Participant> {
    let now = now_timestamp();

    let row = sqlx::query(&format!(
        r#"
        UPDATE participants
        SET is_active = 1, role = ?, employee_ref = ?, joined_at = ?
        WHERE id = ?
        RETURNING {PARTICIPANT_COLUMNS}
        "#
    ))
    .bind(role.as_str())
    .bind(employee_ref)
    .bind(&now)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DatabaseError::NotFound(format!("participant {id}")))?;

    let participant = participant_from_row(&row)?;

    info!(
        participant_id = id,
        conversation_id = participant.conversation_id,
        user_id = participant.user_id,
        "reactivated participant"
    );

    Ok(participant)
}

/// Returns false when the row was already inactive.
pub async fn deactivate(conn: &mut SqliteConnection, id: i64) -> DatabaseResult<bool> {
    let result = sqlx::query("UPDATE participants SET is_active = 0 WHERE id = ? AND is_active = 1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Advance the read cursor to `at` unless it already points later.
pub async fn advance_read_cursor(
    conn: &mut SqliteConnection,
    id: i64,
    at: &str,
) -> DatabaseResult<String> {
    let cursor: Option<String> = sqlx::query_scalar(
        r#"
        UPDATE participants
        SET last_read_at = CASE
            WHEN last_read_at IS NULL OR last_read_at < ? THEN ?
            ELSE last_read_at
        END
        WHERE id = ?
        RETURNING last_read_at
        "#,
    )
    .bind(at)
    .bind(at)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .flatten();

    cursor.ok_or_else(|| DatabaseError::NotFound(format!("participant {id}")))
}

pub async fn set_muted(conn: &mut SqliteConnection, id: i64, muted: bool) -> DatabaseResult<()> {
    sqlx::query("UPDATE participants SET is_muted = ? WHERE id = ?")
        .bind(muted)
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub async fn set_role(
    conn: &mut SqliteConnection,
    id: i64,
    role: ParticipantRole,
) -> DatabaseResult<()> {
    sqlx::query("UPDATE participants SET role = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    info!(participant_id = id, role = %role, "updated participant role");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ConversationType, NewConversation};
    use crate::repos::conversation_repository;
    use crate::repos::test_support::create_test_pool;

    async fn seed_conversation(conn: &mut SqliteConnection) -> i64 {
        conversation_repository::insert(
            conn,
            &NewConversation {
                business_id: 1,
                conversation_type: ConversationType::Group,
                title: None,
                created_by: 10,
            },
        )
        .await
        .unwrap()
        .id
    }

    fn member(conversation_id: i64, user_id: i64) -> NewParticipant {
        NewParticipant {
            conversation_id,
            user_id,
            employee_ref: format!("emp-{user_id}"),
            role: ParticipantRole::Member,
        }
    }

    #[tokio::test]
    async fn duplicate_membership_is_reported_as_duplicate() {
        let (pool, _dir) = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let conversation_id = seed_conversation(&mut conn).await;

        insert(&mut conn, &member(conversation_id, 20)).await.unwrap();
        let err = insert(&mut conn, &member(conversation_id, 20))
            .await
            .expect_err("second insert must violate uniqueness");

        assert!(err.is_duplicate_on("participants"));
    }

    #[tokio::test]
    async fn leave_and_reactivate_reuses_the_row() {
        let (pool, _dir) = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let conversation_id = seed_conversation(&mut conn).await;
        let original = insert(&mut conn, &member(conversation_id, 20)).await.unwrap();

        assert!(deactivate(&mut conn, original.id).await.unwrap());
        assert!(!deactivate(&mut conn, original.id).await.unwrap());
        assert!(find_active(&mut conn, conversation_id, 20).await.unwrap().is_none());

        let back = reactivate(&mut conn, original.id, ParticipantRole::Member, "emp-20b")
            .await
            .unwrap();
        assert_eq!(back.id, original.id);
        assert!(back.is_active);
        assert_eq!(back.employee_ref, "emp-20b");
        assert_eq!(list_active(&mut conn, conversation_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn read_cursor_only_moves_forward() {
        let (pool, _dir) = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let conversation_id = seed_conversation(&mut conn).await;
        let participant = insert(&mut conn, &member(conversation_id, 20)).await.unwrap();

        let first = advance_read_cursor(&mut conn, participant.id, "2024-05-01T00:00:00.000000Z")
            .await
            .unwrap();
        let second = advance_read_cursor(&mut conn, participant.id, "2024-04-01T00:00:00.000000Z")
            .await
            .unwrap();

        assert_eq!(first, "2024-05-01T00:00:00.000000Z");
        assert_eq!(second, first);
    }
}
