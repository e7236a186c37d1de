//! Relay Database Crate
//!
//! Connection management, embedded migrations and the repositories behind
//! the messaging core. Repository functions run on any `SqliteConnection`,
//! which lets the domain layer compose several of them in one transaction.

use sqlx::SqlitePool;
use relay_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::{run_migrations, MIGRATOR};

pub use entities::{
    AttachmentRef, Conversation, ConversationType, DeliveryStatus, Employee, Invitation,
    InvitationStatus, Message, MessageType, NewConversation, NewInvitation,
    NewMessage, NewParticipant, Participant, ParticipantRole, Receipt,
};
pub use repos::{
    conversation_repository, employee_repository, invitation_repository, message_repository,
    message_status_repository, participant_repository, ConversationListing, MessageRecord,
    ReceiptCounts, ReplyTarget,
};
pub use types::{
    errors::DatabaseError, format_timestamp, normalize_timestamp, now_timestamp, DatabaseResult,
};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_database() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let config = DatabaseConfig {
            url: db_url,
            max_connections: 2,
        };

        let pool = initialize_database(&config).await.unwrap();
        (pool, temp_dir)
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let (pool, _temp_dir) = create_test_database().await;

        let result: (bool,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();

        assert!(result.0);
    }

    #[tokio::test]
    async fn test_participant_requires_existing_conversation() {
        let (pool, _temp_dir) = create_test_database().await;
        let mut conn = pool.acquire().await.unwrap();

        let result = participant_repository::insert(
            &mut conn,
            &NewParticipant {
                conversation_id: 999,
                user_id: 1,
                employee_ref: "emp-1".to_string(),
                role: ParticipantRole::Member,
            },
        )
        .await;

        assert!(matches!(result, Err(DatabaseError::QueryError(_))));
    }
}
