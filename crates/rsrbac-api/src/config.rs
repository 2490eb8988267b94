//! Configuration management.
//!
//! Configuration is loaded from three layered sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! Environment variables take precedence over config file values, which take
//! precedence over defaults. Variables use the `RSRBAC_` prefix with `__` as
//! the nested key separator, e.g. `RSRBAC_RATE_LIMIT__REQUESTS_PER_MINUTE=120`.

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    /// Server network settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Rate limiting (admission control) settings
    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    /// Audit logging settings
    #[serde(default)]
    pub audit_log: AuditLogSettings,

    /// Token issuance/verification settings
    #[serde(default)]
    pub token: TokenSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Server network settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Rate limiting settings.
///
/// Example YAML:
///
/// ```yaml
/// rate_limit:
///   enabled: true
///   requests_per_minute: 60
///   exclude_paths: ["/health", "/error"]
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct RateLimitSettings {
    /// Enable the admission controller.
    /// Environment variable: `RSRBAC_RATE_LIMIT__ENABLED`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum requests per minute per client key.
    /// Environment variable: `RSRBAC_RATE_LIMIT__REQUESTS_PER_MINUTE`
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Path prefixes excluded from rate limiting (exact or subpath match).
    #[serde(default = "default_rate_limit_excludes")]
    pub exclude_paths: Vec<String>,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: default_requests_per_minute(),
            exclude_paths: default_rate_limit_excludes(),
        }
    }
}

fn default_requests_per_minute() -> u32 {
    60
}

fn default_rate_limit_excludes() -> Vec<String> {
    vec!["/health".to_string(), "/error".to_string()]
}

/// Audit logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuditLogSettings {
    /// Enable the activity recorder.
    /// Environment variable: `RSRBAC_AUDIT_LOG__ENABLED`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum captured body length before truncation.
    /// Environment variable: `RSRBAC_AUDIT_LOG__MAX_BODY_LENGTH`
    #[serde(default = "default_max_body_length")]
    pub max_body_length: usize,

    /// Path prefixes excluded from auditing (exact or subpath match).
    #[serde(default = "default_audit_excludes")]
    pub exclude_paths: Vec<String>,
}

impl Default for AuditLogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_body_length: default_max_body_length(),
            exclude_paths: default_audit_excludes(),
        }
    }
}

fn default_max_body_length() -> usize {
    4096
}

fn default_audit_excludes() -> Vec<String> {
    vec!["/health".to_string(), "/error".to_string()]
}

/// Token settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TokenSettings {
    /// Shared HMAC secret. Must be set in production.
    /// Environment variable: `RSRBAC_TOKEN__SECRET`
    #[serde(default)]
    pub secret: String,

    /// Token time-to-live in milliseconds.
    /// Environment variable: `RSRBAC_TOKEN__TTL_MILLIS`
    #[serde(default = "default_ttl_millis")]
    pub ttl_millis: i64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            secret: String::new(),
            ttl_millis: default_ttl_millis(),
        }
    }
}

fn default_ttl_millis() -> i64 {
    3_600_000
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl AppConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(
                Environment::with_prefix("RSRBAC")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(
                Environment::with_prefix("RSRBAC")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.server.port == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "server.port must be greater than 0".to_string(),
            });
        }

        if self.token.secret.trim().is_empty() {
            return Err(ConfigLoadError::Invalid {
                message: "token.secret must be set".to_string(),
            });
        }

        if self.token.ttl_millis <= 0 {
            return Err(ConfigLoadError::Invalid {
                message: "token.ttl_millis must be positive".to_string(),
            });
        }

        if self.rate_limit.requests_per_minute == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "rate_limit.requests_per_minute must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn valid_defaults() -> AppConfig {
        let mut config = AppConfig::default();
        config.token.secret = "unit-test-secret".to_string();
        config
    }

    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9090

rate_limit:
  enabled: true
  requests_per_minute: 120
  exclude_paths: ["/health"]

audit_log:
  enabled: false
  max_body_length: 1024

token:
  secret: file-secret
  ttl_millis: 60000

logging:
  level: debug
  json: true
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.rate_limit.requests_per_minute, 120);
        assert_eq!(config.rate_limit.exclude_paths, vec!["/health"]);
        assert!(!config.audit_log.enabled);
        assert_eq!(config.audit_log.max_body_length, 1024);
        assert_eq!(config.token.secret, "file-secret");
        assert_eq!(config.token.ttl_millis, 60000);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    #[serial]
    fn test_env_vars_override_file_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  port: 8080

token:
  secret: file-secret
"#
        )
        .unwrap();

        std::env::set_var("RSRBAC_SERVER__PORT", "9999");
        std::env::set_var("RSRBAC_RATE_LIMIT__REQUESTS_PER_MINUTE", "7");

        let config = AppConfig::load(file.path()).unwrap();

        std::env::remove_var("RSRBAC_SERVER__PORT");
        std::env::remove_var("RSRBAC_RATE_LIMIT__REQUESTS_PER_MINUTE");

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.rate_limit.requests_per_minute, 7);
        assert_eq!(config.token.secret, "file-secret");
    }

    #[test]
    fn test_validation_catches_errors() {
        let mut config = valid_defaults();
        config.token.secret = "   ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("token.secret"));

        let mut config = valid_defaults();
        config.token.ttl_millis = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ttl_millis"));

        let mut config = valid_defaults();
        config.rate_limit.requests_per_minute = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("requests_per_minute"));

        let mut config = valid_defaults();
        config.logging.level = "loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_missing_file_returns_clear_error() {
        let result = AppConfig::load("/nonexistent/path/config.yaml");
        assert!(matches!(
            result.unwrap_err(),
            ConfigLoadError::FileNotFound { .. }
        ));
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.requests_per_minute, 60);
        assert!(config.audit_log.enabled);
        assert_eq!(config.audit_log.max_body_length, 4096);
        assert_eq!(config.token.ttl_millis, 3_600_000);
        assert_eq!(config.logging.level, "info");
        // Default secret is empty, so defaults alone do not validate.
        assert!(config.validate().is_err());
    }
}
