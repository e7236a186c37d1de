//! Database migrations

use anyhow::Context;
use sqlx::SqlitePool;
use tracing::info;

// Include migrations from the migrations directory
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("database migrations failed")?;
    info!("database migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::prepare_database;
    use relay_config::DatabaseConfig;
    use tempfile::TempDir;

    async fn migrated_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_migrations.db");
        let config = DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 1,
        };

        let pool = prepare_database(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        (pool, temp_dir)
    }

    #[tokio::test]
    async fn test_migrations_create_messaging_tables() {
        let (pool, _temp_dir) = migrated_pool().await;

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table'")
                .fetch_all(&pool)
                .await
                .unwrap();

        for expected in [
            "conversations",
            "employees",
            "invitations",
            "message_statuses",
            "messages",
            "participants",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
    }

    #[tokio::test]
    async fn test_listing_and_membership_indexes_exist() {
        let (pool, _temp_dir) = migrated_pool().await;

        let indexes: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'index'")
                .fetch_all(&pool)
                .await
                .unwrap();

        for expected in [
            "idx_messages_conversation_listing",
            "idx_participants_conversation_active",
            "idx_invitations_pending_invitee",
        ] {
            assert!(indexes.iter().any(|i| i == expected), "missing index {expected}");
        }
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let (pool, _temp_dir) = migrated_pool().await;
        run_migrations(&pool).await.unwrap();
    }
}
