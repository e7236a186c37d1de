use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "relay.toml",
    "config/relay.toml",
    "crates/config/relay.toml",
    "../relay.toml",
    "../config/relay.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://relay.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Limits applied by the messaging core.
///
/// ```
/// use relay_config::MessagingConfig;
///
/// let messaging = MessagingConfig::default();
/// assert_eq!(messaging.default_page_size, 50);
/// assert!(messaging.default_page_size <= messaging.max_page_size);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    #[serde(default = "MessagingConfig::default_max_message_length")]
    pub max_message_length: usize,
    #[serde(default = "MessagingConfig::default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "MessagingConfig::default_max_page_size")]
    pub max_page_size: u32,
    /// Expiry applied to invitations created without one. Zero disables it.
    #[serde(default = "MessagingConfig::default_invitation_ttl")]
    pub default_invitation_ttl_hours: u64,
}

impl MessagingConfig {
    const fn default_max_message_length() -> usize {
        10_000
    }

    const fn default_page_size() -> u32 {
        50
    }

    const fn default_max_page_size() -> u32 {
        200
    }

    const fn default_invitation_ttl() -> u64 {
        168
    }
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            max_message_length: Self::default_max_message_length(),
            default_page_size: Self::default_page_size(),
            max_page_size: Self::default_max_page_size(),
            default_invitation_ttl_hours: Self::default_invitation_ttl(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryBackend {
    /// Employees mirrored into the local `employees` table.
    #[default]
    Database,
    /// Remote business directory service.
    Http,
}

/// Where employee lookups go and how long they may take.
///
/// ```
/// use relay_config::{DirectoryBackend, DirectoryConfig};
///
/// let directory = DirectoryConfig::default();
/// assert_eq!(directory.backend, DirectoryBackend::Database);
/// assert_eq!(directory.timeout_ms, 2_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub backend: DirectoryBackend,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "DirectoryConfig::default_timeout")]
    pub timeout_ms: u64,
}

impl DirectoryConfig {
    const fn default_timeout() -> u64 {
        2_000
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            backend: DirectoryBackend::default(),
            base_url: None,
            api_token: None,
            timeout_ms: Self::default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "NotifierConfig::default_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "NotifierConfig::default_queue_capacity")]
    pub queue_capacity: usize,
}

impl NotifierConfig {
    const fn default_timeout() -> u64 {
        5_000
    }

    const fn default_queue_capacity() -> usize {
        1_024
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_ms: Self::default_timeout(),
            queue_capacity: Self::default_queue_capacity(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use relay_config::load;
///
/// std::env::remove_var("RELAY_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?;

    let environment_overrides = config::Environment::with_prefix("RELAY").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("RELAY_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via RELAY_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    validate(&config)?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}

fn validate(config: &AppConfig) -> anyhow::Result<()> {
    if config.directory.timeout_ms == 0 {
        bail!("invalid configuration: directory.timeout_ms must be greater than zero");
    }

    if config.directory.backend == DirectoryBackend::Http && config.directory.base_url.is_none() {
        bail!("invalid configuration: directory.base_url is required for the http backend");
    }

    if config.messaging.max_page_size == 0
        || config.messaging.default_page_size > config.messaging.max_page_size
    {
        bail!("invalid configuration: messaging page sizes are inconsistent");
    }

    Ok(())
}
