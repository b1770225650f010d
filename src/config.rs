//! Configuration module for filecab.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::file::{Backoff, RetryPolicy};
use crate::{FilecabError, Result};

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the Web API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key (required).
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_jwt_access_expiry")]
    pub jwt_access_token_expiry_secs: u64,
    /// Refresh token expiry in days.
    #[serde(default = "default_jwt_refresh_expiry")]
    pub jwt_refresh_token_expiry_days: u64,
    /// Rate limit for login and registration (requests per minute).
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
    /// Rate limit for general API endpoints (requests per minute).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    3000
}

fn default_jwt_access_expiry() -> u64 {
    900 // 15 minutes
}

fn default_jwt_refresh_expiry() -> u64 {
    7
}

fn default_login_rate_limit() -> u32 {
    10
}

fn default_api_rate_limit() -> u32 {
    300
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            jwt_secret: String::new(),
            jwt_access_token_expiry_secs: default_jwt_access_expiry(),
            jwt_refresh_token_expiry_days: default_jwt_refresh_expiry(),
            login_rate_limit: default_login_rate_limit(),
            api_rate_limit: default_api_rate_limit(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/filecab.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Retry settings applied to every blob store operation.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per operation, including the first.
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub delay_ms: u64,
    /// Delay growth between attempts.
    #[serde(default)]
    pub backoff: Backoff,
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    2000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            delay_ms: default_retry_delay(),
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    /// Build the retry policy described by this configuration.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
            .with_backoff(self.backoff)
    }
}

/// Blob and upload storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory of the local blob store.
    #[serde(default = "default_blob_path")]
    pub blob_path: String,
    /// URL prefix under which stored blobs are reachable.
    #[serde(default = "default_public_url")]
    pub public_url: String,
    /// Directory holding uploads until they reach the blob store.
    #[serde(default = "default_staging_path")]
    pub staging_path: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// Retry policy for blob store calls.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_blob_path() -> String {
    "data/blobs".to_string()
}

fn default_public_url() -> String {
    "/blobs".to_string()
}

fn default_staging_path() -> String {
    "data/uploads".to_string()
}

fn default_max_upload_size() -> u64 {
    25
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_path: default_blob_path(),
            public_url: default_public_url(),
            staging_path: default_staging_path(),
            max_upload_size_mb: default_max_upload_size(),
            retry: RetryConfig::default(),
        }
    }
}

impl StorageConfig {
    /// Maximum upload size in bytes, saturating at `u64::MAX`.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/filecab.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob and upload storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FilecabError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FilecabError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILECAB_JWT_SECRET`: JWT secret key
    /// - `FILECAB_PORT`: Web API port
    /// - `FILECAB_DATABASE_PATH`: SQLite database file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("FILECAB_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.web.jwt_secret = jwt_secret;
            }
        }

        if let Ok(port) = std::env::var("FILECAB_PORT") {
            match port.parse() {
                Ok(port) => self.web.port = port,
                Err(_) => eprintln!("Ignoring invalid FILECAB_PORT value: {port}"),
            }
        }

        if let Ok(path) = std::env::var("FILECAB_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(FilecabError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via the FILECAB_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.storage.retry.max_attempts == 0 {
            return Err(FilecabError::Config(
                "storage.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.storage.max_upload_size_mb == 0 {
            return Err(FilecabError::Config(
                "storage.max_upload_size_mb must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.web.port, 3000);
        assert_eq!(config.database.path, "data/filecab.db");
        assert_eq!(config.storage.retry.max_attempts, 3);
        assert_eq!(config.storage.retry.delay_ms, 2000);
        assert_eq!(config.storage.retry.backoff, Backoff::Fixed);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[web]
port = 8081
jwt_secret = "s3cret"

[storage]
max_upload_size_mb = 2

[storage.retry]
max_attempts = 5
delay_ms = 100
backoff = "exponential"
"#;
        let config = Config::parse(toml).unwrap();
        assert_eq!(config.web.port, 8081);
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.storage.max_upload_bytes(), 2 * 1024 * 1024);
        assert_eq!(config.storage.retry.max_attempts, 5);
        assert_eq!(config.storage.retry.backoff, Backoff::Exponential);

        let policy = config.storage.retry.policy();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay_before(2), Duration::from_millis(100));
        assert_eq!(policy.delay_before(3), Duration::from_millis(200));
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("[web\nport = ");
        assert!(matches!(result, Err(FilecabError::Config(_))));
    }

    #[test]
    fn test_validate_requires_jwt_secret() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_upload_bytes_saturates() {
        let mut storage = StorageConfig::default();
        assert_eq!(storage.max_upload_bytes(), 25 * 1024 * 1024);

        storage.max_upload_size_mb = u64::MAX / 2;
        assert_eq!(storage.max_upload_bytes(), u64::MAX);
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();
        config.storage.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }
}
