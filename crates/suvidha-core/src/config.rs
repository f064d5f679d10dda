//! Configuration management for the SUVIDHA admin console

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Storage key under which the session envelope is persisted
pub const DEFAULT_STORAGE_KEY: &str = "admin-auth-storage";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Backend API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Dashboard configuration
    #[serde(default)]
    pub dashboard: DashboardConfig,

    /// Export configuration
    #[serde(default)]
    pub export: ExportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Gateway base URL, including the `/api` prefix
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle threshold in seconds before an admin session is force-terminated
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// File backing the durable key/value storage
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    /// Key of the session envelope inside the storage
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

/// Dashboard configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Metrics polling interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

/// Export configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory CSV exports are written to
    #[serde(default = "default_export_directory")]
    pub directory: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json or pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_idle_timeout() -> u64 {
    300 // 5 minutes
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".suvidha").join("storage.json")
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

const fn default_poll_interval() -> u64 {
    15
}

fn default_export_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            storage_path: default_storage_path(),
            storage_key: default_storage_key(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_directory(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a [`Duration`]
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl SessionConfig {
    /// Idle threshold as a [`Duration`]
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl DashboardConfig {
    /// Polling interval as a [`Duration`]
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Config {
    /// Load configuration from `suvidha.toml` (optional) and `SUVIDHA__*` variables
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded, parsed or validated.
    pub fn load() -> crate::Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, reading the given file instead of `suvidha.toml`
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or malformed, or validation fails.
    pub fn load_from(path: Option<&Path>) -> crate::Result<Self> {
        let file = path.map_or_else(
            || config::File::with_name("suvidha").required(false),
            |path| config::File::from(path).required(true),
        );

        let config: Self = config::Config::builder()
            .add_source(file)
            .add_source(config::Environment::with_prefix("SUVIDHA").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Check invariants the rest of the console relies on
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending field.
    pub fn validate(&self) -> crate::Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(crate::Error::validation("api.base_url", "must not be empty"));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(crate::Error::validation(
                "api.request_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.session.idle_timeout_secs == 0 {
            return Err(crate::Error::validation(
                "session.idle_timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.session.storage_key.is_empty() {
            return Err(crate::Error::validation(
                "session.storage_key",
                "must not be empty",
            ));
        }
        if self.dashboard.poll_interval_secs == 0 {
            return Err(crate::Error::validation(
                "dashboard.poll_interval_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.api.base_url, "http://localhost:8080/api");
        assert_eq!(config.api.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.session.idle_timeout(), Duration::from_secs(300));
        assert_eq!(config.session.storage_key, "admin-auth-storage");
        assert_eq!(config.dashboard.poll_interval(), Duration::from_secs(15));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[api]
base_url = "https://gateway.example/api"

[session]
idle_timeout_secs = 120
storage_key = "ops-auth"
"#
        )
        .unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();

        assert_eq!(config.api.base_url, "https://gateway.example/api");
        assert_eq!(config.api.request_timeout_secs, 30);
        assert_eq!(config.session.idle_timeout_secs, 120);
        assert_eq!(config.session.storage_key, "ops-auth");
        assert_eq!(config.dashboard, DashboardConfig::default());
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load_from(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(crate::Error::Configuration { .. })));
    }

    #[test]
    fn test_zero_idle_timeout_rejected() {
        let mut config = Config::default();
        config.session.idle_timeout_secs = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("session.idle_timeout_secs"));
    }

    #[test]
    fn test_empty_storage_key_rejected() {
        let mut config = Config::default();
        config.session.storage_key.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serializes_to_toml_compatible_json() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert_eq!(json["session"]["idle_timeout_secs"], 300);
        assert_eq!(json["dashboard"]["poll_interval_secs"], 15);
    }
}
