//! Configuration module for the keeper service
//!
//! Supports YAML configuration files with section-based organization

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use topology::ClientConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Redis data plane configuration
    #[serde(default)]
    pub redis: RedisConfig,
    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Merge with another config (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        self.server.merge(other.server);
        self.redis.merge(other.redis);
        self.log.merge(other.log);
    }

    /// Apply command line overrides on top of the loaded file
    pub fn apply_overrides(&mut self, listen_addr: Option<String>, log_level: Option<String>) {
        self.merge(Config {
            server: ServerConfig {
                listen_addr: listen_addr.unwrap_or_default(),
            },
            redis: RedisConfig::unset(),
            log: LogConfig {
                level: log_level.unwrap_or_default(),
            },
        });
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Command surface listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl ServerConfig {
    fn merge(&mut self, other: Self) {
        if !other.listen_addr.is_empty() {
            self.listen_addr = other.listen_addr;
        }
    }
}

/// Redis data plane configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis port on every cluster node
    #[serde(default = "default_redis_port")]
    pub port: u16,
    /// CA bundle used when a cluster has TLS enabled
    #[serde(default = "default_tls_ca_path")]
    pub tls_ca_path: PathBuf,
    /// Cluster tool invoked inside the leader container
    #[serde(default = "default_cli_path")]
    pub cli_path: String,
    /// Per-command deadline in milliseconds
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// Per-exec deadline in seconds
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            port: default_redis_port(),
            tls_ca_path: default_tls_ca_path(),
            cli_path: default_cli_path(),
            command_timeout_ms: default_command_timeout_ms(),
            exec_timeout_secs: default_exec_timeout_secs(),
        }
    }
}

impl RedisConfig {
    /// All fields empty, so merging it changes nothing
    fn unset() -> Self {
        Self {
            port: 0,
            tls_ca_path: PathBuf::new(),
            cli_path: String::new(),
            command_timeout_ms: 0,
            exec_timeout_secs: 0,
        }
    }

    fn merge(&mut self, other: Self) {
        if other.port > 0 {
            self.port = other.port;
        }
        if !other.tls_ca_path.as_os_str().is_empty() {
            self.tls_ca_path = other.tls_ca_path;
        }
        if !other.cli_path.is_empty() {
            self.cli_path = other.cli_path;
        }
        if other.command_timeout_ms > 0 {
            self.command_timeout_ms = other.command_timeout_ms;
        }
        if other.exec_timeout_secs > 0 {
            self.exec_timeout_secs = other.exec_timeout_secs;
        }
    }

    /// Get command timeout as Duration
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Get exec timeout as Duration
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }

    /// Settings handed to the topology engine
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            redis_port: self.port,
            tls_ca_path: self.tls_ca_path.clone(),
            cli_path: self.cli_path.clone(),
            command_timeout: self.command_timeout(),
            exec_timeout: self.exec_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LogConfig {
    fn merge(&mut self, other: Self) {
        if !other.level.is_empty() {
            self.level = other.level;
        }
    }
}

// Default value functions

fn default_listen_addr() -> String {
    "0.0.0.0:8090".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_tls_ca_path() -> PathBuf {
    PathBuf::from("/tls/ca.crt")
}

fn default_cli_path() -> String {
    "redis-cli".to_string()
}

fn default_command_timeout_ms() -> u64 {
    10000 // 10 seconds
}

fn default_exec_timeout_secs() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}
