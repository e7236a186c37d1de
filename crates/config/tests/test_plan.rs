//! Comprehensive test plan for the `relay-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and validation behaviour.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use relay_config::{load, AppConfig, DirectoryBackend, HttpConfig, MessagingConfig};

const ENV_VARS_TO_RESET: &[&str] = &[
    "RELAY_CONFIG",
    "RELAY__DATABASE__MAX_CONNECTIONS",
    "RELAY__DATABASE__URL",
    "RELAY__DIRECTORY__BACKEND",
    "RELAY__DIRECTORY__BASE_URL",
    "RELAY__DIRECTORY__TIMEOUT_MS",
    "RELAY__HTTP__ADDRESS",
    "RELAY__HTTP__PORT",
    "RELAY__MESSAGING__DEFAULT_INVITATION_TTL_HOURS",
    "RELAY__MESSAGING__MAX_MESSAGE_LENGTH",
    "RELAY__NOTIFIER__WEBHOOK_URL",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(
        config.messaging.max_message_length,
        defaults.messaging.max_message_length
    );
    assert_eq!(config.directory.backend, DirectoryBackend::Database);
    assert!(config.notifier.webhook_url.is_none());
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "relay.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/relay.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "relay.toml",
        r#"
        [database]
        max_connections = 50

        [messaging]
        max_message_length = 500
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.database.max_connections, 50);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.messaging.max_message_length, 500);
    assert_eq!(
        config.messaging.default_page_size,
        defaults.messaging.default_page_size
    );
}

#[test]
#[serial]
fn load_reads_file_named_by_relay_config() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [notifier]
        webhook_url = "http://hooks.internal/relay"
        queue_capacity = 16
        "#,
    );
    let path = temp_dir.path().join("elsewhere/custom.toml");
    ctx.set_var("RELAY_CONFIG", path.display().to_string());

    let config = load().expect("configuration load should use RELAY_CONFIG");
    assert_eq!(
        config.notifier.webhook_url.as_deref(),
        Some("http://hooks.internal/relay")
    );
    assert_eq!(config.notifier.queue_capacity, 16);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "relay.toml",
        r#"
        [http]
        port = 3030
        "#,
    );

    ctx.set_var("RELAY__HTTP__PORT", "8080");
    ctx.set_var("RELAY__DIRECTORY__TIMEOUT_MS", "250");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.directory.timeout_ms, 250);
}

#[test]
#[serial]
fn load_accepts_http_directory_with_base_url() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("RELAY__DIRECTORY__BACKEND", "http");
    ctx.set_var("RELAY__DIRECTORY__BASE_URL", "http://directory.internal");

    let config = load().expect("http directory with base url should load");
    assert_eq!(config.directory.backend, DirectoryBackend::Http);
    assert_eq!(
        config.directory.base_url.as_deref(),
        Some("http://directory.internal")
    );
}

#[test]
#[serial]
fn load_rejects_http_directory_without_base_url() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("RELAY__DIRECTORY__BACKEND", "http");

    let error = load().expect_err("http directory without base url must fail");
    assert!(error.to_string().contains("directory.base_url"));
}

#[test]
#[serial]
fn load_rejects_zero_directory_timeout() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    ctx.set_var("RELAY__DIRECTORY__TIMEOUT_MS", "0");

    let error = load().expect_err("zero timeout must fail");
    assert!(error.to_string().contains("timeout_ms"));
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());

    write_config_file(
        temp_dir.path(),
        "relay.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration")
            || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn messaging_config_defaults_enable_invitation_expiry() {
    let defaults = MessagingConfig::default();
    assert_eq!(defaults.default_invitation_ttl_hours, 168);
    assert_eq!(defaults.max_page_size, 200);
}

#[test]
fn http_config_defaults_match_expected_host_and_port() {
    let defaults = HttpConfig::default();
    assert_eq!(defaults.address, "127.0.0.1");
    assert_eq!(defaults.port, 7070);
}
