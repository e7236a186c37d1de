use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use relay_config::{AppConfig, DirectoryBackend, DirectoryConfig, NotifierConfig};
use relay_database::initialize_database;
use relay_messaging::{
    DirectoryGate, EmployeeDirectory, EventDispatcher, HttpEmployeeDirectory, LogNotifier,
    MessagingContext, MessagingCore, Notifier, SqlEmployeeDirectory, WebhookNotifier,
};
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::TRACE)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Everything the server needs, wired from configuration.
#[derive(Clone)]
pub struct MessagingServices {
    pub db_pool: SqlitePool,
    pub core: MessagingCore,
}

impl MessagingServices {
    /// Open the database, apply migrations, pick the employee directory and
    /// start the notification worker. Must run inside a Tokio runtime.
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to prepare database")?;

        let directory = build_directory(&config.directory, &db_pool)?;
        let gate = DirectoryGate::new(
            directory,
            Duration::from_millis(config.directory.timeout_ms),
        );

        let notifier = build_notifier(&config.notifier)?;
        let events = EventDispatcher::spawn(notifier, config.notifier.queue_capacity);

        let ctx = MessagingContext::new(db_pool.clone(), gate, events, config.messaging.clone());

        info!(
            directory = ?config.directory.backend,
            webhook = config.notifier.webhook_url.is_some(),
            "messaging services ready"
        );

        Ok(Self {
            db_pool,
            core: MessagingCore::new(ctx),
        })
    }
}

fn build_directory(
    config: &DirectoryConfig,
    pool: &SqlitePool,
) -> Result<Arc<dyn EmployeeDirectory>> {
    match config.backend {
        DirectoryBackend::Database => Ok(Arc::new(SqlEmployeeDirectory::new(pool.clone()))),
        DirectoryBackend::Http => {
            let base_url = config
                .base_url
                .clone()
                .context("directory.base_url is required for the http backend")?;
            let directory = HttpEmployeeDirectory::new(
                base_url,
                config.api_token.clone(),
                Duration::from_millis(config.timeout_ms),
            )
            .context("failed to build directory client")?;
            Ok(Arc::new(directory))
        }
    }
}

fn build_notifier(config: &NotifierConfig) -> Result<Arc<dyn Notifier>> {
    match &config.webhook_url {
        Some(url) => {
            let notifier =
                WebhookNotifier::new(url.clone(), Duration::from_millis(config.timeout_ms))
                    .context("failed to build webhook notifier")?;
            Ok(Arc::new(notifier))
        }
        None => Ok(Arc::new(LogNotifier)),
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
