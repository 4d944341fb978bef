//! Server configuration
//!
//! Loaded from a YAML or TOML file (picked by extension), with serde
//! defaults for every field so a missing or partial file still yields a
//! runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use directiva_tenancy::ConnectionDescriptor;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "~/.directiva/config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    FileRead(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Unsupported config format: {0} (expected .yaml, .yml or .toml)")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the control database, the session store, and
    /// every tenant database.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Control database override. When absent, a SQLite store named
    /// `directiva.sqlite3` under `data_dir` is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<ConnectionDescriptor>,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Session lifetime in seconds. Default: two weeks.
    #[serde(default = "default_session_lifetime")]
    pub lifetime_secs: i64,

    /// Interval between expired-session sweeps, in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_false")]
    pub log_requests: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
            database: None,
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            lifetime_secs: default_session_lifetime(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_requests: default_false(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from `path`, or defaults when the file does
    /// not exist.
    ///
    /// # Errors
    /// - `ConfigError::FileRead` for unreadable files
    /// - `ConfigError::Parse` for syntax errors
    /// - `ConfigError::UnknownFormat` for unrecognized extensions
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let expanded = shellexpand::tilde(path);
        let path = Path::new(expanded.as_ref());

        if !path.exists() {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::FileRead(format!("{}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            Some("toml") => {
                toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            other => Err(ConfigError::UnknownFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }

    /// Data directory with the tilde expanded.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.data_dir).as_ref())
    }

    /// Descriptor for the control database.
    pub fn control_descriptor(&self) -> ConnectionDescriptor {
        self.database
            .clone()
            .unwrap_or_else(|| ConnectionDescriptor::sqlite(self.data_dir().join("directiva.sqlite3")))
    }

    /// Path of the session store database.
    pub fn session_store_path(&self) -> PathBuf {
        self.data_dir().join("sessions.sqlite3")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8600
}

fn default_data_dir() -> String {
    "~/.directiva/data".to_string()
}

fn default_cookie_name() -> String {
    "directiva_session".to_string()
}

fn default_session_lifetime() -> i64 {
    60 * 60 * 24 * 14
}

fn default_cleanup_interval() -> u64 {
    3600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_false() -> bool {
    false
}
