//! Configuration loading and typed config structures for the log proxy.
//!
//! Configuration lives in `logproxy.yaml` (or the file named by
//! `LOGPROXY_CONFIG`). Every field has a default, so a missing file or an
//! empty one yields a working setup. A handful of environment variables
//! override the file so deployments can adjust the essentials without
//! editing YAML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "logproxy.yaml";

/// Environment variable naming an alternative config file.
pub const CONFIG_PATH_ENV: &str = "LOGPROXY_CONFIG";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// An environment override could not be parsed.
    #[error("invalid value for {name}: {value:?} ({reason})")]
    InvalidOverride {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level proxy configuration.
///
/// Mirrors the structure of `logproxy.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProxyConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Where session data is kept.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session correlation settings.
    #[serde(default)]
    pub reassembly: ReassemblyConfig,

    /// Live viewer hub settings.
    #[serde(default)]
    pub hub: HubConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ProxyConfig {
    /// Load configuration for the running process.
    ///
    /// Reads `LOGPROXY_CONFIG` or `logproxy.yaml`; falls back to defaults
    /// when that file does not exist. Environment overrides are applied
    /// last:
    /// - `LOGPROXY_PORT` overrides `server.port`
    /// - `LOGPROXY_DATA_DIR` overrides `storage.data_dir`
    /// - `LOGPROXY_LOG_LEVEL` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed, or if an override is malformed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides supplied by `lookup` (normally the environment).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if `LOGPROXY_PORT` is not a
    /// valid port number.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("LOGPROXY_PORT") {
            self.server.port =
                val.trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidOverride {
                        name: "LOGPROXY_PORT",
                        value: val.clone(),
                        reason: e.to_string(),
                    })?;
        }
        if let Some(val) = lookup("LOGPROXY_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(val);
        }
        if let Some(val) = lookup("LOGPROXY_LOG_LEVEL") {
            self.logging.level = val;
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: String,

    /// The TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Root directory for server states, byte logs and chunk records.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Session correlation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReassemblyConfig {
    /// Longest gap, in seconds, after which a chunk no longer continues a
    /// session even if its offset lines up.
    #[serde(default = "default_correlation_window_secs")]
    pub correlation_window_secs: u64,
}

impl ReassemblyConfig {
    /// The correlation window as a [`Duration`].
    pub const fn correlation_window(&self) -> Duration {
        Duration::from_secs(self.correlation_window_secs)
    }
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        Self {
            correlation_window_secs: default_correlation_window_secs(),
        }
    }
}

/// Live viewer hub settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HubConfig {
    /// Frames buffered per viewer before new frames are dropped for it.
    #[serde(default = "default_client_buffer")]
    pub client_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            client_buffer: default_client_buffer(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    8081
}

const fn default_max_body_bytes() -> usize {
    8_388_608
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./logs")
}

const fn default_correlation_window_secs() -> u64 {
    7_200
}

const fn default_client_buffer() -> usize {
    logproxy_hub::DEFAULT_CLIENT_BUFFER
}

fn default_log_level() -> String {
    String::from("info")
}
