//! Configuration management for system-monitor.
//!
//! This module handles loading and validating configuration from files.
//! It supports YAML, JSON, and TOML formats. The file is organised in three
//! sections: `api` (HTTP server), `database` (registration store credentials)
//! and `registration` (loop pacing).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use tracing::level_filters::LevelFilter;

// Default configuration constants
pub const DEFAULT_API_HOST: &str = "0.0.0.0";
pub const DEFAULT_API_PORT: u16 = 8000;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_RECONNECT_BACKOFF_SECS: u64 = 5;
pub const DEFAULT_SAMPLE_WINDOW_MS: u64 = 1000;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const REDACTED: &str = "********";

/// Default config file locations, searched in order when no path is given.
pub const DEFAULT_CONFIG_PATHS: [&str; 8] = [
    "/etc/system-monitor/config.yaml",
    "/etc/system-monitor/config.yml",
    "/etc/system-monitor/config.toml",
    "/etc/system-monitor/config.json",
    "./system-monitor.yaml",
    "./system-monitor.yml",
    "./system-monitor.toml",
    "./system-monitor.json",
];

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration key '{key}' not found in section '{section}'")]
    MissingKey {
        section: &'static str,
        key: &'static str,
    },

    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP API section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl ApiConfig {
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_API_HOST)
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_API_PORT)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

/// Database section. Credentials have no defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub db: Option<String>,
    #[serde(alias = "connect-timeout-secs")]
    pub connect_timeout_secs: Option<u64>,
    /// Create the `server_info` table on connect if it does not exist.
    #[serde(alias = "create-schema")]
    pub create_schema: Option<bool>,
}

/// Connection parameters for the registration store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub connect_timeout: Duration,
    pub create_schema: bool,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("database", &self.database)
            .field("connect_timeout", &self.connect_timeout)
            .field("create_schema", &self.create_schema)
            .finish()
    }
}

impl DatabaseConfig {
    /// Returns the store credentials, failing on the first missing key.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        fn required<T: Clone>(value: &Option<T>, key: &'static str) -> Result<T, ConfigError> {
            value.clone().ok_or(ConfigError::MissingKey {
                section: "database",
                key,
            })
        }

        Ok(Credentials {
            host: required(&self.host, "host")?,
            port: required(&self.port, "port")?,
            username: required(&self.username, "username")?,
            password: required(&self.password, "password")?,
            database: required(&self.db, "db")?,
            connect_timeout: Duration::from_secs(
                self.connect_timeout_secs
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
            create_schema: self.create_schema.unwrap_or(false),
        })
    }
}

/// Registration loop section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Pause after a successful cycle (default: 1)
    #[serde(alias = "interval-secs")]
    pub interval_secs: Option<u64>,

    /// Pause between failed reconnect attempts (default: 5)
    #[serde(alias = "reconnect-backoff-secs")]
    pub reconnect_backoff_secs: Option<u64>,

    /// CPU sampling window (default: 1000)
    #[serde(alias = "sample-window-ms")]
    pub sample_window_ms: Option<u64>,

    /// Address registered instead of the auto-detected one.
    #[serde(alias = "advertise-ip")]
    pub advertise_ip: Option<String>,
}

impl RegistrationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS))
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(
            self.reconnect_backoff_secs
                .unwrap_or(DEFAULT_RECONNECT_BACKOFF_SECS),
        )
    }

    pub fn sample_window(&self) -> Duration {
        Duration::from_millis(self.sample_window_ms.unwrap_or(DEFAULT_SAMPLE_WINDOW_MS))
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
}

impl Config {
    /// Configuration with every default spelled out, used for templates.
    pub fn template() -> Self {
        Self {
            api: ApiConfig {
                host: Some(DEFAULT_API_HOST.to_string()),
                port: Some(DEFAULT_API_PORT),
                log_level: Some(DEFAULT_LOG_LEVEL.to_string()),
            },
            database: DatabaseConfig {
                host: Some("localhost".to_string()),
                port: Some(5432),
                username: Some("monitor".to_string()),
                password: Some("change-me".to_string()),
                db: Some("fleet".to_string()),
                connect_timeout_secs: Some(DEFAULT_CONNECT_TIMEOUT_SECS),
                create_schema: Some(false),
            },
            registration: RegistrationConfig {
                interval_secs: Some(DEFAULT_INTERVAL_SECS),
                reconnect_backoff_secs: Some(DEFAULT_RECONNECT_BACKOFF_SECS),
                sample_window_ms: Some(DEFAULT_SAMPLE_WINDOW_MS),
                advertise_ip: None,
            },
        }
    }

    /// Copy of the configuration safe for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.database.password.is_some() {
            copy.database.password = Some(REDACTED.to_string());
        }
        copy
    }

    /// Parsed `registration.advertise_ip`, if set.
    pub fn advertise_ip(&self) -> Result<Option<IpAddr>, ConfigError> {
        match self.registration.advertise_ip.as_deref() {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<IpAddr>().map(Some).map_err(|_| {
                ConfigError::Invalid(format!("registration.advertise_ip '{raw}' is not an IP address"))
            }),
        }
    }
}

/// Maps a textual log level to a tracing filter.
///
/// Accepts the tracing names plus `warning` and `critical`.
pub fn parse_log_level(level: &str) -> Option<LevelFilter> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Some(LevelFilter::OFF),
        "critical" | "error" => Some(LevelFilter::ERROR),
        "warn" | "warning" => Some(LevelFilter::WARN),
        "info" => Some(LevelFilter::INFO),
        "debug" => Some(LevelFilter::DEBUG),
        "trace" => Some(LevelFilter::TRACE),
        _ => None,
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.api.port == Some(0) {
        return Err(ConfigError::Invalid("api.port must be greater than 0".into()));
    }

    if parse_log_level(cfg.api.log_level()).is_none() {
        return Err(ConfigError::Invalid(format!(
            "Invalid api.log_level '{}', expected one of off/error/warn/info/debug/trace",
            cfg.api.log_level()
        )));
    }

    if cfg.database.port == Some(0) {
        return Err(ConfigError::Invalid(
            "database.port must be greater than 0".into(),
        ));
    }

    let reg = &cfg.registration;
    if reg.interval_secs == Some(0) {
        return Err(ConfigError::Invalid(
            "registration.interval_secs must be greater than 0".into(),
        ));
    }
    if reg.reconnect_backoff_secs == Some(0) {
        return Err(ConfigError::Invalid(
            "registration.reconnect_backoff_secs must be greater than 0".into(),
        ));
    }
    if reg.sample_window_ms == Some(0) {
        return Err(ConfigError::Invalid(
            "registration.sample_window_ms must be greater than 0".into(),
        ));
    }

    cfg.advertise_ip()?;

    Ok(())
}

/// Finds the first existing default config file.
fn find_default_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Loads configuration from `path`, or from the default locations.
///
/// A missing default file yields the built-in defaults; an explicitly
/// requested file that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match find_default_config() {
            Some(p) => p,
            None => {
                info!("No configuration file found, using defaults");
                return Ok(Config::default());
            }
        },
    };

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;

    let parse_err = |message: String| ConfigError::Parse {
        path: path.clone(),
        message,
    };

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        // Default to YAML
        _ => serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
    };

    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}
