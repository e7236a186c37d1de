//! Delivery receipt data access.

use sqlx::{Row, SqliteConnection};

use crate::entities::{DeliveryStatus, Receipt};
use crate::types::DatabaseResult;

// Rank of the stored status, matching `DeliveryStatus::rank`.
const STATUS_RANK: &str = "CASE status WHEN 'sent' THEN 0 WHEN 'delivered' THEN 1 ELSE 2 END";

/// Create one `sent` row per recipient. Run inside the append transaction;
/// any failure aborts the whole fan-out.
pub async fn insert_sent(
    conn: &mut SqliteConnection,
    message_id: i64,
    participant_ids: &[i64],
    at: &str,
) -> DatabaseResult<u64> {
    let mut created = 0;

    for &participant_id in participant_ids {
        created += sqlx::query(
            r#"
            INSERT INTO message_statuses (message_id, participant_id, status, status_changed_at)
            VALUES (?, ?, 'sent', ?)
            "#,
        )
        .bind(message_id)
        .bind(participant_id)
        .bind(at)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    }

    Ok(created)
}

/// Move one receipt forward to `target`. Rows already at or past `target`
/// are left alone; the return value is the number of rows that moved.
pub async fn advance_one(
    conn: &mut SqliteConnection,
    participant_id: i64,
    message_id: i64,
    target: DeliveryStatus,
    at: &str,
) -> DatabaseResult<u64> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE message_statuses
        SET status = ?, status_changed_at = ?
        WHERE participant_id = ? AND message_id = ? AND {STATUS_RANK} < ?
        "#
    ))
    .bind(target.as_str())
    .bind(at)
    .bind(participant_id)
    .bind(message_id)
    .bind(target.rank())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Move every receipt the participant holds in a conversation forward.
pub async fn advance_all(
    conn: &mut SqliteConnection,
    participant_id: i64,
    conversation_id: i64,
    target: DeliveryStatus,
    at: &str,
) -> DatabaseResult<u64> {
    let result = sqlx::query(&format!(
        r#"
        UPDATE message_statuses
        SET status = ?, status_changed_at = ?
        WHERE participant_id = ?
          AND {STATUS_RANK} < ?
          AND message_id IN (SELECT id FROM messages WHERE conversation_id = ?)
        "#
    ))
    .bind(target.as_str())
    .bind(at)
    .bind(participant_id)
    .bind(target.rank())
    .bind(conversation_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Receipts for a message keyed by recipient user id.
pub async fn receipts_for_message(
    conn: &mut SqliteConnection,
    message_id: i64,
) -> DatabaseResult<Vec<Receipt>> {
    let rows = sqlx::query(
        r#"
        SELECT p.user_id, s.status, s.status_changed_at
        FROM message_statuses s
        JOIN participants p ON p.id = s.participant_id
        WHERE s.message_id = ?
        ORDER BY p.user_id ASC
        "#,
    )
    .bind(message_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter()
        .map(|row| {
            let status: String = row.try_get("status")?;
            Ok(Receipt {
                user_id: row.try_get("user_id")?,
                status: status.parse()?,
                status_changed_at: row.try_get("status_changed_at")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        ConversationType, MessageType, NewConversation, NewMessage, NewParticipant,
        ParticipantRole,
    };
    use crate::repos::test_support::create_test_pool;
    use crate::repos::{conversation_repository, message_repository, participant_repository};
    use crate::types::now_timestamp;

    struct Fixture {
        conversation_id: i64,
        message_id: i64,
        recipient_id: i64,
    }

    async fn seed(conn: &mut SqliteConnection) -> Fixture {
        let conversation = conversation_repository::insert(
            conn,
            &NewConversation {
                business_id: 1,
                conversation_type: ConversationType::Direct,
                title: None,
                created_by: 1,
            },
        )
        .await
        .unwrap();
        let recipient = participant_repository::insert(
            conn,
            &NewParticipant {
                conversation_id: conversation.id,
                user_id: 2,
                employee_ref: "emp-2".to_string(),
                role: ParticipantRole::Member,
            },
        )
        .await
        .unwrap();
        let message = message_repository::insert(
            conn,
            &NewMessage {
                conversation_id: conversation.id,
                sender_id: 1,
                sender_employee_ref: "emp-1".to_string(),
                content: "hello".to_string(),
                message_type: MessageType::Text,
                attachment: None,
                reply_to_id: None,
            },
        )
        .await
        .unwrap();

        Fixture {
            conversation_id: conversation.id,
            message_id: message.id,
            recipient_id: recipient.id,
        }
    }

    #[tokio::test]
    async fn advancing_backwards_is_a_no_op() {
        let (pool, _dir) = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let fx = seed(&mut conn).await;
        let now = now_timestamp();

        insert_sent(&mut conn, fx.message_id, &[fx.recipient_id], &now)
            .await
            .unwrap();

        let moved = advance_one(
            &mut conn,
            fx.recipient_id,
            fx.message_id,
            DeliveryStatus::Read,
            &now,
        )
        .await
        .unwrap();
        assert_eq!(moved, 1);

        let moved = advance_one(
            &mut conn,
            fx.recipient_id,
            fx.message_id,
            DeliveryStatus::Delivered,
            &now,
        )
        .await
        .unwrap();
        assert_eq!(moved, 0);

        let receipts = receipts_for_message(&mut conn, fx.message_id).await.unwrap();
        assert_eq!(receipts[0].status, DeliveryStatus::Read);
    }

    #[tokio::test]
    async fn advance_all_is_scoped_to_conversation() {
        let (pool, _dir) = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let fx = seed(&mut conn).await;
        let now = now_timestamp();
        insert_sent(&mut conn, fx.message_id, &[fx.recipient_id], &now)
            .await
            .unwrap();

        let moved = advance_all(
            &mut conn,
            fx.recipient_id,
            fx.conversation_id + 1,
            DeliveryStatus::Delivered,
            &now,
        )
        .await
        .unwrap();
        assert_eq!(moved, 0);

        let moved = advance_all(
            &mut conn,
            fx.recipient_id,
            fx.conversation_id,
            DeliveryStatus::Delivered,
            &now,
        )
        .await
        .unwrap();
        assert_eq!(moved, 1);

        let receipts = receipts_for_message(&mut conn, fx.message_id).await.unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].user_id, 2);
        assert_eq!(receipts[0].status, DeliveryStatus::Delivered);
    }

    #[tokio::test]
    async fn duplicate_receipt_is_rejected() {
        let (pool, _dir) = create_test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let fx = seed(&mut conn).await;
        let now = now_timestamp();

        insert_sent(&mut conn, fx.message_id, &[fx.recipient_id], &now)
            .await
            .unwrap();
        let err = insert_sent(&mut conn, fx.message_id, &[fx.recipient_id], &now)
            .await
            .expect_err("receipt pair must be unique");

        assert!(err.is_duplicate_on("message_statuses"));
        assert_eq!(receipts_for_message(&mut conn, fx.message_id).await.unwrap().len(), 1);
    }
}
