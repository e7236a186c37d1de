//! Message log data access.

use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};
use tracing::info;

use crate::entities::{AttachmentRef, Message, NewMessage};
use crate::types::{now_timestamp, DatabaseError, DatabaseResult};

const MESSAGE_COLUMNS: &str = "m.id, m.public_id, m.conversation_id, m.sender_id, \
     m.sender_employee_ref, m.content, m.message_type, m.attachment, m.reply_to_id, \
     m.is_edited, m.edited_at, m.is_deleted, m.deleted_at, m.created_at";

const RETURNING_COLUMNS: &str = "id, public_id, conversation_id, sender_id, sender_employee_ref, \
     content, message_type, attachment, reply_to_id, is_edited, edited_at, is_deleted, \
     deleted_at, created_at";

/// The message a reply points at, as much as a preview needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyTarget {
    pub public_id: String,
    pub sender_id: i64,
    pub content: String,
    pub is_deleted: bool,
}

/// Counts of recipient statuses for one message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiptCounts {
    pub sent: i64,
    pub delivered: i64,
    pub read: i64,
}

/// A message with everything a listing shows next to it.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub message: Message,
    pub reply_to: Option<ReplyTarget>,
    pub receipts: ReceiptCounts,
    pub replies_count: i64,
}

fn message_from_row(row: &SqliteRow) -> DatabaseResult<Message> {
    let message_type: String = row.try_get("message_type")?;
    let attachment: Option<String> = row.try_get("attachment")?;
    let attachment = attachment
        .map(|raw| serde_json::from_str::<AttachmentRef>(&raw))
        .transpose()?;

    Ok(Message {
        id: row.try_get("id")?,
        public_id: row.try_get("public_id")?,
        conversation_id: row.try_get("conversation_id")?,
        sender_id: row.try_get("sender_id")?,
        sender_employee_ref: row.try_get("sender_employee_ref")?,
        content: row.try_get("content")?,
        message_type: message_type.parse()?,
        attachment,
        reply_to_id: row.try_get("reply_to_id")?,
        is_edited: row.try_get("is_edited")?,
        edited_at: row.try_get("edited_at")?,
        is_deleted: row.try_get("is_deleted")?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn record_from_row(row: &SqliteRow) -> DatabaseResult<MessageRecord> {
    let reply_public_id: Option<String> = row.try_get("reply_public_id")?;
    let reply_to = match reply_public_id {
        Some(public_id) => Some(ReplyTarget {
            public_id,
            sender_id: row.try_get("reply_sender_id")?,
            content: row.try_get("reply_content")?,
            is_deleted: row.try_get("reply_is_deleted")?,
        }),
        None => None,
    };

    Ok(MessageRecord {
        message: message_from_row(row)?,
        reply_to,
        receipts: ReceiptCounts {
            sent: row.try_get("sent_count")?,
            delivered: row.try_get("delivered_count")?,
            read: row.try_get("read_count")?,
        },
        replies_count: row.try_get("replies_count")?,
    })
}

fn record_query(filter: &str, tail: &str) -> String {
    format!(
        r#"
        SELECT {MESSAGE_COLUMNS},
               r.public_id AS reply_public_id,
               r.sender_id AS reply_sender_id,
               r.content AS reply_content,
               r.is_deleted AS reply_is_deleted,
               (SELECT COUNT(*) FROM message_statuses s
                WHERE s.message_id = m.id AND s.status = 'sent') AS sent_count,
               (SELECT COUNT(*) FROM message_statuses s
                WHERE s.message_id = m.id AND s.status = 'delivered') AS delivered_count,
               (SELECT COUNT(*) FROM message_statuses s
                WHERE s.message_id = m.id AND s.status = 'read') AS read_count,
               (SELECT COUNT(*) FROM messages child
                WHERE child.reply_to_id = m.id) AS replies_count
        FROM messages m
        LEFT JOIN messages r ON r.id = m.reply_to_id
        WHERE {filter}
        {tail}
        "#
    )
}

pub async fn insert(conn: &mut SqliteConnection, request: &NewMessage) -> DatabaseResult<Message> {
    let now = now_timestamp();
    let public_id = cuid2::create_id();
    let attachment = request
        .attachment
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let id = sqlx::query(
        r#"
        INSERT INTO messages
            (public_id, conversation_id, sender_id, sender_employee_ref, content, message_type,
             attachment, reply_to_id, is_edited, is_deleted, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?)
        "#,
    )
    .bind(&public_id)
    .bind(request.conversation_id)
    .bind(request.sender_id)
    .bind(&request.sender_employee_ref)
    .bind(&request.content)
    .bind(request.message_type.as_str())
    .bind(attachment)
    .bind(request.reply_to_id)
    .bind(&now)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(Message {
        id,
        public_id,
        conversation_id: request.conversation_id,
        sender_id: request.sender_id,
        sender_employee_ref: request.sender_employee_ref.clone(),
        content: request.content.clone(),
        message_type: request.message_type,
        attachment: request.attachment.clone(),
        reply_to_id: request.reply_to_id,
        is_edited: false,
        edited_at: None,
        is_deleted: false,
        deleted_at: None,
        created_at: now,
    })
}

pub async fn find_by_public_id(
    conn: &mut SqliteConnection,
    public_id: &str,
) -> DatabaseResult<Option<Message>> {
    let row = sqlx::query(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.public_id = ?"
    ))
    .bind(public_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(message_from_row).transpose()
}

/// Look a message up only within one conversation.
pub async fn find_in_conversation(
    conn: &mut SqliteConnection,
    conversation_id: i64,
    public_id: &str,
) -> DatabaseResult<Option<Message>> {
    let row = sqlx::query(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages m WHERE m.public_id = ? AND m.conversation_id = ?"
    ))
    .bind(public_id)
    .bind(conversation_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(message_from_row).transpose()
}

pub async fn find_record(
    conn: &mut SqliteConnection,
    id: i64,
) -> DatabaseResult<Option<MessageRecord>> {
    let row = sqlx::query(&record_query("m.id = ?", ""))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Newest first, ties broken by insertion order.
pub async fn list_records(
    conn: &mut SqliteConnection,
    conversation_id: i64,
    include_deleted: bool,
    limit: i64,
    offset: i64,
) -> DatabaseResult<Vec<MessageRecord>> {
    let rows = sqlx::query(&record_query(
        "m.conversation_id = ? AND (? OR m.is_deleted = 0)",
        "ORDER BY m.created_at DESC, m.id DESC LIMIT ? OFFSET ?",
    ))
    .bind(conversation_id)
    .bind(include_deleted)
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(record_from_row).collect()
}

/// Most recent message that has not been deleted.
pub async fn latest_visible(
    conn: &mut SqliteConnection,
    conversation_id: i64,
) -> DatabaseResult<Option<Message>> {
    let row = sqlx::query(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages m
         WHERE m.conversation_id = ? AND m.is_deleted = 0
         ORDER BY m.created_at DESC, m.id DESC
         LIMIT 1"
    ))
    .bind(conversation_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(message_from_row).transpose()
}

/// Replace the content of a live message. Returns `None` if the message is
/// missing or already deleted.
pub async fn update_content(
    conn: &mut SqliteConnection,
    id: i64,
    content: &str,
) -> DatabaseResult<Option<Message>> {
    let now = now_timestamp();

    let row = sqlx::query(&format!(
        r#"
        UPDATE messages
        SET content = ?, is_edited = 1, edited_at = ?
        WHERE id = ? AND is_deleted = 0
        RETURNING {RETURNING_COLUMNS}
        "#
    ))
    .bind(content)
    .bind(&now)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let message = row.as_ref().map(message_from_row).transpose()?;
    if let Some(message) = &message {
        info!(message_id = %message.public_id, "edited message");
    }
    Ok(message)
}

/// Mark a message deleted. The row, its replies and its receipts stay.
pub async fn soft_delete(conn: &mut SqliteConnection, id: i64) -> DatabaseResult<Message> {
    let now = now_timestamp();

    let row = sqlx::query(&format!(
        r#"
        UPDATE messages
        SET is_deleted = 1, deleted_at = ?
        WHERE id = ? AND is_deleted = 0
        RETURNING {RETURNING_COLUMNS}
        "#
    ))
    .bind(&now)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DatabaseError::NotFound(format!("message {id}")))?;

    let message = message_from_row(&row)?;
    info!(message_id = %message.public_id, "soft-deleted message");
    Ok(message)
}

/// Unread count for the participant row aliased `p`: messages by others,
/// not deleted, newer than its read cursor. Shared by every query that
/// reports unread counts.
pub(crate) const UNREAD_FOR_PARTICIPANT: &str = "(SELECT COUNT(*) FROM messages m \
     WHERE m.conversation_id = p.conversation_id \
       AND m.is_deleted = 0 \
       AND m.sender_id != p.user_id \
       AND (p.last_read_at IS NULL OR m.created_at > p.last_read_at))";

/// Evaluated as one statement so cursor and log are read from one snapshot.
pub async fn count_unread(conn: &mut SqliteConnection, participant_id: i64) -> DatabaseResult<i64> {
    let count: Option<i64> = sqlx::query_scalar(&format!(
        "SELECT {UNREAD_FOR_PARTICIPANT} FROM participants p WHERE p.id = ?"
    ))
    .bind(participant_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(count.unwrap_or(0))
}
