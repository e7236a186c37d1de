//! Conversation data access.

use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use tracing::info;

use crate::entities::{Conversation, ConversationType, NewConversation, ParticipantRole};
use crate::repos::message_repository::UNREAD_FOR_PARTICIPANT;
use crate::types::{now_timestamp, DatabaseResult};

const CONVERSATION_COLUMNS: &str = "c.id, c.public_id, c.business_id, c.conversation_type, c.title, \
     c.created_by, c.is_active, c.last_activity_at, c.created_at, c.updated_at";

/// One row of a user's inbox: the conversation, the user's role in it and
/// the unread count computed in the same statement.
#[derive(Debug, Clone)]
pub struct ConversationListing {
    pub conversation: Conversation,
    pub role: ParticipantRole,
    pub is_muted: bool,
    pub unread_count: i64,
}

pub(crate) fn conversation_from_row(row: &SqliteRow) -> DatabaseResult<Conversation> {
    let conversation_type: String = row.try_get("conversation_type")?;

    Ok(Conversation {
        id: row.try_get("id")?,
        public_id: row.try_get("public_id")?,
        business_id: row.try_get("business_id")?,
        conversation_type: conversation_type.parse()?,
        title: row.try_get("title")?,
        created_by: row.try_get("created_by")?,
        is_active: row.try_get("is_active")?,
        last_activity_at: row.try_get("last_activity_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn insert(
    conn: &mut SqliteConnection,
    request: &NewConversation,
) -> DatabaseResult<Conversation> {
    let now = now_timestamp();
    let public_id = cuid2::create_id();

    let id = sqlx::query(
        r#"
        INSERT INTO conversations
            (public_id, business_id, conversation_type, title, created_by, is_active,
             last_activity_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?)
        "#,
    )
    .bind(&public_id)
    .bind(request.business_id)
    .bind(request.conversation_type.as_str())
    .bind(request.title.as_deref())
    .bind(request.created_by)
    .bind(&now)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    info!(
        conversation_id = %public_id,
        business_id = request.business_id,
        conversation_type = %request.conversation_type,
        "created conversation"
    );

    Ok(Conversation {
        id,
        public_id,
        business_id: request.business_id,
        conversation_type: request.conversation_type,
        title: request.title.clone(),
        created_by: request.created_by,
        is_active: true,
        last_activity_at: now.clone(),
        created_at: now.clone(),
        updated_at: now,
    })
}

pub async fn find_by_public_id(
    conn: &mut SqliteConnection,
    public_id: &str,
) -> DatabaseResult<Option<Conversation>> {
    let row = sqlx::query(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.public_id = ?"
    ))
    .bind(public_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(conversation_from_row).transpose()
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> DatabaseResult<Option<Conversation>> {
    let row = sqlx::query(&format!(
        "SELECT {CONVERSATION_COLUMNS} FROM conversations c WHERE c.id = ?"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(conversation_from_row).transpose()
}

/// Take the database write lock for the open transaction. Timestamps read
/// after this call are ordered the same way as the commits that carry them.
pub async fn lock_for_write(conn: &mut SqliteConnection, id: i64) -> DatabaseResult<()> {
    sqlx::query("UPDATE conversations SET is_active = is_active WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Move the activity timestamp forward. Never moves it backwards, so
/// concurrent appends committing out of order keep it non-decreasing.
pub async fn touch_activity(
    conn: &mut SqliteConnection,
    id: i64,
    at: &str,
) -> DatabaseResult<()> {
    sqlx::query(
        r#"
        UPDATE conversations
        SET last_activity_at = MAX(last_activity_at, ?), updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(at)
    .bind(at)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Returns false when the conversation was already inactive.
pub async fn deactivate(conn: &mut SqliteConnection, id: i64) -> DatabaseResult<bool> {
    let now = now_timestamp();
    let result = sqlx::query(
        "UPDATE conversations SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1",
    )
    .bind(&now)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Active conversations the user actively participates in, most recent first.
pub async fn list_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    business_id: Option<i64>,
    conversation_type: Option<ConversationType>,
) -> DatabaseResult<Vec<ConversationListing>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {CONVERSATION_COLUMNS}, p.role AS participant_role, p.is_muted AS participant_muted,
               {UNREAD_FOR_PARTICIPANT} AS unread_count
        FROM conversations c
        JOIN participants p ON p.conversation_id = c.id
        WHERE p.user_id = ?
          AND p.is_active = 1
          AND c.is_active = 1
          AND (? IS NULL OR c.business_id = ?)
          AND (? IS NULL OR c.conversation_type = ?)
        ORDER BY c.last_activity_at DESC, c.id DESC
        "#
    ))
    .bind(user_id)
    .bind(business_id)
    .bind(business_id)
    .bind(conversation_type.map(|t| t.as_str()))
    .bind(conversation_type.map(|t| t.as_str()))
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let role: String = row.try_get("participant_role")?;
            Ok(ConversationListing {
                conversation: conversation_from_row(row)?,
                role: role.parse()?,
                is_muted: row.try_get("participant_muted")?,
                unread_count: row.try_get("unread_count")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::test_support::create_test_pool;

    fn group(business_id: i64) -> NewConversation {
        NewConversation {
            business_id,
            conversation_type: ConversationType::Group,
            title: Some("Ops".to_string()),
            created_by: 1,
        }
    }

    #[tokio::test]
    async fn insert_and_find_round_trip() {
        let (pool, _dir) = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let created = insert(&mut conn, &group(7)).await.unwrap();
        let found = find_by_public_id(&mut conn, &created.public_id)
            .await
            .unwrap()
            .expect("conversation should exist");

        assert_eq!(found, created);
        assert!(find_by_public_id(&mut conn, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn touch_activity_never_moves_backwards() {
        let (pool, _dir) = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let created = insert(&mut conn, &group(7)).await.unwrap();

        touch_activity(&mut conn, created.id, "2999-01-01T00:00:00.000000Z")
            .await
            .unwrap();
        touch_activity(&mut conn, created.id, "2000-01-01T00:00:00.000000Z")
            .await
            .unwrap();

        let found = find_by_id(&mut conn, created.id).await.unwrap().unwrap();
        assert_eq!(found.last_activity_at, "2999-01-01T00:00:00.000000Z");
    }

    #[tokio::test]
    async fn deactivate_reports_first_transition_only() {
        let (pool, _dir) = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let created = insert(&mut conn, &group(7)).await.unwrap();

        assert!(deactivate(&mut conn, created.id).await.unwrap());
        assert!(!deactivate(&mut conn, created.id).await.unwrap());
    }
}
