//! Configuration module for the filedock server.
//!
//! Supports both command-line arguments and a TOML configuration file.
//! CLI arguments take precedence over config file values.

use crate::connection::{ConnectionSettings, DEFAULT_MAX_REQUEST_BYTES};
use crate::server::PoolPolicy;
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Command-line arguments for the file server
#[derive(Parser, Debug, Default)]
#[command(name = "filedock")]
#[command(author = "Ariz")]
#[command(version)]
#[command(about = "A remote file-storage server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to (e.g., 0.0.0.0)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Maximum number of requests served at once
    #[arg(short = 'w', long)]
    pub workers: Option<usize>,

    /// Worker isolation model
    #[arg(long, value_enum)]
    pub policy: Option<PoolPolicy>,

    /// Listen backlog for connections waiting to be accepted
    #[arg(long)]
    pub backlog: Option<u32>,

    /// Close connections idle for this many seconds (0 = never)
    #[arg(long)]
    pub read_timeout: Option<u64>,

    /// Largest request accepted, in bytes
    #[arg(long)]
    pub max_request_bytes: Option<usize>,

    /// Directory holding the stored files
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Size of the worker pool
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Worker isolation model
    #[serde(default)]
    pub policy: PoolPolicy,
    /// Listen backlog
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// Idle read timeout in seconds (0 = disabled)
    #[serde(default)]
    pub read_timeout_secs: u64,
    /// Largest request accepted, in bytes
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_workers: default_max_workers(),
            policy: PoolPolicy::default(),
            backlog: default_backlog(),
            read_timeout_secs: 0,
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

/// Storage-related configuration
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the stored files
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
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
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7777
}

fn default_max_workers() -> usize {
    5
}

fn default_backlog() -> u32 {
    128
}

fn default_max_request_bytes() -> usize {
    DEFAULT_MAX_REQUEST_BYTES
}

fn default_root() -> PathBuf {
    PathBuf::from("files")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_workers: usize,
    pub policy: PoolPolicy,
    pub backlog: u32,
    pub read_timeout: Option<Duration>,
    pub max_request_bytes: usize,
    pub storage_root: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        // Defaults always pass validation
        Self::merge(CliArgs::default(), TomlConfig::default())
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_args(CliArgs::parse())
    }

    /// Resolve configuration from already-parsed CLI args.
    pub fn from_args(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = match cli.config {
            Some(ref config_path) => {
                let contents =
                    std::fs::read_to_string(config_path).map_err(|e| ConfigError::FileRead {
                        path: config_path.clone(),
                        source: e,
                    })?;
                Self::parse_toml(&contents).map_err(|e| ConfigError::TomlParse {
                    path: config_path.clone(),
                    source: e,
                })?
            }
            None => TomlConfig::default(),
        };

        let config = Self::merge(cli, toml_config);
        config.validate()?;
        Ok(config)
    }

    /// Parse the contents of a TOML configuration file.
    pub fn parse_toml(contents: &str) -> Result<TomlConfig, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Merge CLI args with TOML config (CLI takes precedence)
    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        let TomlConfig {
            server,
            storage,
            logging,
        } = toml_config;

        let read_timeout_secs = cli.read_timeout.unwrap_or(server.read_timeout_secs);

        Config {
            host: cli.host.unwrap_or(server.host),
            port: cli.port.unwrap_or(server.port),
            max_workers: cli.workers.unwrap_or(server.max_workers),
            policy: cli.policy.unwrap_or(server.policy),
            backlog: cli.backlog.unwrap_or(server.backlog),
            read_timeout: (read_timeout_secs > 0).then(|| Duration::from_secs(read_timeout_secs)),
            max_request_bytes: cli.max_request_bytes.unwrap_or(server.max_request_bytes),
            storage_root: cli.root.unwrap_or(storage.root),
            log_level: cli.log_level.unwrap_or(logging.level),
        }
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_request_bytes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// The per-connection limits derived from this configuration.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            read_timeout: self.read_timeout,
            max_request_bytes: self.max_request_bytes,
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {source}", path.display())]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0:7777");
        assert_eq!(config.max_workers, 5);
        assert_eq!(config.policy, PoolPolicy::Shared);
        assert_eq!(config.read_timeout, None);
        assert_eq!(config.storage_root, PathBuf::from("files"));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            host = "127.0.0.1"
            port = 8889
            max_workers = 50
            policy = "process"
            read_timeout_secs = 30

            [storage]
            root = "/srv/files"

            [logging]
            level = "debug"
        "#;

        let toml_config = Config::parse_toml(toml_str).unwrap();
        let config = Config::merge(CliArgs::default(), toml_config);
        assert_eq!(config.bind_address(), "127.0.0.1:8889");
        assert_eq!(config.max_workers, 50);
        assert_eq!(config.policy, PoolPolicy::Isolated);
        assert_eq!(config.read_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.storage_root, PathBuf::from("/srv/files"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 9000\nmax_workers = 2").unwrap();

        let cli = CliArgs::try_parse_from([
            "filedock",
            "--config",
            file.path().to_str().unwrap(),
            "--workers",
            "8",
            "--policy",
            "isolated",
        ])
        .unwrap();

        let config = Config::from_args(cli).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.policy, PoolPolicy::Isolated);
    }

    #[test]
    fn test_policy_aliases() {
        let cli = CliArgs::try_parse_from(["filedock", "--policy", "thread"]).unwrap();
        assert_eq!(cli.policy, Some(PoolPolicy::Shared));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let cli = CliArgs::try_parse_from(["filedock", "-w", "0"]).unwrap();
        assert!(matches!(
            Config::from_args(cli),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let cli = CliArgs {
            config: Some(PathBuf::from("/definitely/not/here.toml")),
            ..CliArgs::default()
        };
        assert!(matches!(
            Config::from_args(cli),
            Err(ConfigError::FileRead { .. })
        ));
    }

    #[test]
    fn test_ipv6_bind_address() {
        let config = Config {
            host: "::1".to_string(),
            ..Config::default()
        };
        assert_eq!(config.bind_address(), "[::1]:7777");
    }

    #[test]
    fn test_connection_settings() {
        let config = Config {
            read_timeout: Some(Duration::from_secs(5)),
            max_request_bytes: 1024,
            ..Config::default()
        };
        let settings = config.connection_settings();
        assert_eq!(settings.read_timeout, Some(Duration::from_secs(5)));
        assert_eq!(settings.max_request_bytes, 1024);
    }
}
