use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use relay_config::{AppConfig, DirectoryBackend};
use relay_database::{employee_repository, ConversationType};
use relay_messaging::{AppendMessageRequest, CreateConversationRequest, ErrorKind};
use relay_runtime::{self, MessagingServices};
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy())
}

fn build_config(database_url: String, max_connections: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = database_url;
    config.database.max_connections = max_connections;
    config
}

async fn initialise(config: &AppConfig) -> Result<MessagingServices> {
    MessagingServices::initialise(config)
        .await
        .context("failed to initialise messaging services")
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_runs_migrations() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/init.db");
    let config = build_config(sqlite_url(&db_path), 4);

    let services = initialise(&config).await?;
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' ORDER BY name",
    )
    .fetch_all(&services.db_pool)
    .await?;

    for expected in [
        "conversations",
        "employees",
        "invitations",
        "message_statuses",
        "messages",
        "participants",
    ] {
        assert!(
            tables.iter().any(|table| table == expected),
            "missing table {expected}, found {tables:?}"
        );
    }

    drop(services);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn database_directory_reads_employees_table() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/directory.db");
    let config = build_config(sqlite_url(&db_path), 2);
    let services = initialise(&config).await?;

    {
        let mut conn = services.db_pool.acquire().await?;
        employee_repository::upsert(&mut conn, 5, 1, "E-1").await?;
        employee_repository::upsert(&mut conn, 5, 2, "E-2").await?;
    }

    let request = |participant_ids: Vec<i64>| CreateConversationRequest {
        business_id: 5,
        conversation_type: ConversationType::Group,
        title: None,
        participant_ids,
    };

    let error = services
        .core
        .conversations
        .create(1, request(vec![2, 3]))
        .await
        .expect_err("user 3 is not an employee");
    assert_eq!(error.kind(), ErrorKind::InvalidParticipant);

    let detail = services
        .core
        .conversations
        .create(1, request(vec![2]))
        .await?;
    let message = services
        .core
        .messages
        .append(&detail.conversation.id, 2, AppendMessageRequest::text("on my way"))
        .await?;
    assert_eq!(message.sender_employee_ref, "E-2");

    drop(services);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn http_directory_requires_base_url() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/http.db");
    let mut config = build_config(sqlite_url(&db_path), 1);
    config.directory.backend = DirectoryBackend::Http;
    config.directory.base_url = None;

    let error = match MessagingServices::initialise(&config).await {
        Ok(_) => panic!("expected initialisation to fail without a directory url"),
        Err(error) => error,
    };
    assert!(
        format!("{error:#}").contains("directory.base_url"),
        "expected missing base url context, got {error:#}"
    );

    config.directory.base_url = Some("http://127.0.0.1:9/directory".to_string());
    config.notifier.webhook_url = Some("http://127.0.0.1:9/hooks".to_string());
    let services = initialise(&config).await?;
    drop(services);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_database_creates_sqlite_directory_if_missing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_dir = temp_dir.path().join("nested");
    let db_path = db_dir.join("prepared.db");
    let config = build_config(sqlite_url(&db_path), 2);

    assert!(!db_dir.exists());

    let services = initialise(&config).await?;
    assert!(db_dir.exists(), "database directory should be created");
    assert!(db_path.exists(), "database file should be created");
    drop(services);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_database_enables_sqlite_foreign_keys() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/foreign_keys.db");
    let config = build_config(sqlite_url(&db_path), 2);

    let services = initialise(&config).await?;

    let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
        .fetch_one(&services.db_pool)
        .await?;
    assert_eq!(1, enabled, "foreign key enforcement must be enabled");

    let journal: String = sqlx::query_scalar("PRAGMA journal_mode")
        .fetch_one(&services.db_pool)
        .await?;
    assert_eq!("wal", journal.to_ascii_lowercase());

    drop(services);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn prepare_database_applies_max_connections_setting() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/max_conn.db");
    let max_connections = 3;
    let config = build_config(sqlite_url(&db_path), max_connections);

    let services = initialise(&config).await?;
    assert_eq!(
        max_connections,
        services.db_pool.options().get_max_connections()
    );

    drop(services);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn non_sqlite_urls_are_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let target_dir = temp_dir.path().join("should_not_exist");
    let malformed_url = format!("postgres://{}/ignored.db", target_dir.to_string_lossy());
    let config = build_config(malformed_url, 1);

    let error = match MessagingServices::initialise(&config).await {
        Ok(_) => panic!("expected sqlite connection to fail for non-sqlite URL"),
        Err(error) => error,
    };
    assert!(
        !target_dir.exists(),
        "non-sqlite URLs must not create filesystem structures"
    );
    assert!(
        format!("{error:#}").contains("failed to prepare database"),
        "expected database preparation failure, got {error:#}"
    );

    Ok(())
}

#[test]
fn telemetry_init_tracing_sets_global_subscriber() {
    relay_runtime::telemetry::init_tracing().expect("first initialisation should succeed");

    let second = relay_runtime::telemetry::init_tracing();
    assert!(
        second.is_err(),
        "initialising telemetry twice should fail with global subscriber already set"
    );
}

#[tokio::test(flavor = "multi_thread")]
#[cfg_attr(not(unix), ignore = "requires Unix signal handling")]
async fn shutdown_signal_completes_on_ctrl_c_notification() -> Result<()> {
    let shutdown_task = tokio::spawn(async { relay_runtime::shutdown_signal().await });

    sleep(Duration::from_millis(50)).await;
    #[cfg(unix)]
    unsafe {
        libc::raise(libc::SIGINT);
    }

    timeout(Duration::from_secs(2), shutdown_task).await??;
    Ok(())
}
