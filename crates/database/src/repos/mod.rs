//! Database repository implementations
//!
//! Every function takes a `&mut SqliteConnection`, so callers can run it on a
//! pooled connection or inside an open transaction (`&mut *tx`).

pub mod conversation_repository;
pub mod employee_repository;
pub mod invitation_repository;
pub mod message_repository;
pub mod message_status_repository;
pub mod participant_repository;

pub use conversation_repository::ConversationListing;
pub use message_repository::{MessageRecord, ReceiptCounts, ReplyTarget};

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    use crate::migrations::MIGRATOR;

    /// Fresh migrated database in a temporary directory.
    pub async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let connect_options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Memory)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(connect_options)
            .await
            .expect("Failed to create test database");

        MIGRATOR.run(&pool).await.expect("Failed to run migrations");

        (pool, temp_dir)
    }
}
