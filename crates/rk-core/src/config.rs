//! Configuration types and loading
//!
//! Sources are layered: built-in defaults, an optional config file, then
//! `REPOKIT__SECTION__KEY` environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Prefix for layered environment overrides
pub const ENV_PREFIX: &str = "REPOKIT";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Repository defaults
    pub repository: RepositorySettings,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout for connections in seconds
    pub idle_timeout_secs: u64,
    /// Maximum lifetime of a connection in seconds
    pub max_lifetime_secs: u64,
    /// Let sqlx log every statement
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/repokit".to_string(),
            max_connections: 10,
            min_connections: 2,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            sqlx_logging: false,
        }
    }
}

impl DatabaseConfig {
    /// Create config with a specific URL
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when RUST_LOG is not set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info,rk_db=debug".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositorySettings {
    /// Page size used when a request does not name one
    pub default_page_size: u64,
    /// Upper bound for requested page sizes
    pub max_page_size: u64,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 1000,
        }
    }
}

impl AppConfig {
    /// Load defaults, then `path` (if given and present), then the
    /// `REPOKIT__*` environment. A `.env` file is honoured.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config: AppConfig = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the conventional environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Some(value) = parse_env("DB_MAX_CONNECTIONS")? {
            config.database.max_connections = value;
        }
        if let Some(value) = parse_env("DB_MIN_CONNECTIONS")? {
            config.database.min_connections = value;
        }
        if let Some(value) = parse_env("DB_CONNECT_TIMEOUT")? {
            config.database.connect_timeout_secs = value;
        }
        if let Some(value) = parse_env("DB_IDLE_TIMEOUT")? {
            config.database.idle_timeout_secs = value;
        }
        if let Some(value) = parse_env("DB_MAX_LIFETIME")? {
            config.database.max_lifetime_secs = value;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "pretty" => LogFormat::Text,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "LOG_FORMAT".to_string(),
                        message: format!("unknown format '{}'", other),
                    })
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::InvalidValue {
                key: "database.min_connections".to_string(),
                message: format!(
                    "{} exceeds max_connections ({})",
                    self.database.min_connections, self.database.max_connections
                ),
            });
        }
        if self.repository.default_page_size == 0
            || self.repository.default_page_size > self.repository.max_page_size
        {
            return Err(ConfigError::InvalidValue {
                key: "repository.default_page_size".to_string(),
                message: format!(
                    "must be between 1 and {}",
                    self.repository.max_page_size
                ),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("cannot parse '{}'", raw),
        }),
        Err(_) => Ok(None),
    }
}
