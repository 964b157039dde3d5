//! # API Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     COMTRACK_PORT=8080                                                 │
//! │     COMTRACK_DATABASE_PATH=/var/lib/comtrack/comtrack.db               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/comtrack/api.toml (Linux)                                │
//! │     ~/Library/Application Support/com.comtrack.comtrack/api.toml       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0"
//! port = 3000
//! log_filter = "info,comtrack_api=debug"
//!
//! [database]
//! path = "./comtrack.db"
//! max_connections = 5
//!
//! [cache]
//! ttl_secs = 300
//! capacity = 256
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Server Settings
// =============================================================================

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Bind address (default: 0.0.0.0 for all interfaces).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
            port: default_port(),
            log_filter: default_log_filter(),
        }
    }
}

impl ServerSettings {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// SQLite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file, created on first start.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    /// Pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./comtrack.db")
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Cache Settings
// =============================================================================

/// Stats cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Time-to-live of a cached aggregation (seconds). Default: 5 minutes.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum entries per cache before eviction.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_capacity() -> usize {
    256
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            ttl_secs: default_ttl_secs(),
            capacity: default_capacity(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete API configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub cache: CacheSettings,
}

impl ApiConfig {
    /// Defaults, then `api.toml` if it exists, then `COMTRACK_*` variables.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_path.or_else(Self::user_config_path) {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!(?path, "No config file, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.merge_env();
        config.validate()?;
        Ok(config)
    }

    /// Parses one TOML file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        info!(?path, "Reading API config");
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let invalid = |msg: &str| -> ConfigResult<()> { Err(ConfigError::Invalid(msg.to_string())) };

        if self.server.port == 0 {
            return invalid("server.port must be non-zero");
        }
        if self.database.path.as_os_str().is_empty() {
            return invalid("database.path must be set");
        }
        if self.database.max_connections == 0 {
            return invalid("database.max_connections must be greater than 0");
        }
        if self.cache.ttl_secs == 0 {
            return invalid("cache.ttl_secs must be greater than 0");
        }
        if self.cache.capacity == 0 {
            return invalid("cache.capacity must be greater than 0");
        }

        Ok(())
    }

    fn merge_env(&mut self) {
        if let Ok(addr) = std::env::var("COMTRACK_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(port) = env_parse("COMTRACK_PORT") {
            self.server.port = port;
        }
        if let Ok(filter) = std::env::var("COMTRACK_LOG") {
            self.server.log_filter = filter;
        }
        if let Ok(path) = std::env::var("COMTRACK_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(max) = env_parse("COMTRACK_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = max;
        }
        if let Some(ttl) = env_parse("COMTRACK_CACHE_TTL_SECS") {
            self.cache.ttl_secs = ttl;
        }
    }

    /// `api.toml` in the platform config directory.
    fn user_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "comtrack", "comtrack")
            .map(|dirs| dirs.config_dir().join("api.toml"))
    }
}

/// Reads and parses an environment variable; unparseable values are ignored.
fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => {
            debug!(name, value = %raw, "Config overridden from environment");
            Some(value)
        }
        Err(_) => {
            warn!(name, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.cache.ttl(), Duration::from_secs(300));
        assert_eq!(config.cache.capacity, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: ApiConfig = toml::from_str(
            r#"
            [server]
            port = 8080

            [cache]
            ttl_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind_addr, "0.0.0.0");
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.cache.capacity, 256);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_config_validation() {
        let mut config = ApiConfig::default();

        config.cache.ttl_secs = 0;
        assert!(config.validate().is_err());

        config.cache.ttl_secs = 300;
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        config.database.max_connections = 1;
        config.server.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_toml_is_a_parse_error() {
        let result: Result<ApiConfig, _> = toml::from_str("[server]\nport = \"three thousand\"");
        assert!(result.is_err());
    }
}
