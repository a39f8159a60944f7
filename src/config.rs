//! Configuration module for the echo-store server.
//!
//! Supports both command-line arguments and a TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Command-line arguments for the echo-store server
#[derive(Parser, Debug)]
#[command(name = "echo-store")]
#[command(author = "echo-store authors")]
#[command(version = "0.1.0")]
#[command(about = "A single-shot TCP echo-store server", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 0.0.0.0:9000)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Path of the storage artifact the received message is appended to
    #[arg(short = 's', long)]
    pub storage_path: Option<PathBuf>,

    /// Run mode: store (append and echo back) or drain (read and log only)
    #[arg(short = 'm', long, value_enum)]
    pub mode: Option<Mode>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// What the server does with the one message it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Append the message to the artifact, stream the artifact back,
    /// then delete it.
    Store,
    /// Log the message and exit without storing or responding.
    Drain,
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
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Run mode
    #[serde(default = "default_mode")]
    pub mode: Mode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            mode: default_mode(),
        }
    }
}

/// Storage-related configuration
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    /// Path of the storage artifact
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
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

fn default_listen() -> String {
    "0.0.0.0:9000".to_string()
}

fn default_mode() -> Mode {
    Mode::Store
}

fn default_storage_path() -> PathBuf {
    std::env::temp_dir().join("echo_store_data.txt")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub storage_path: PathBuf,
    pub mode: Mode,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::resolve(CliArgs::parse())
    }

    /// Merge parsed CLI args with the TOML file they may point at.
    pub fn resolve(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let listen = cli.listen.unwrap_or(toml_config.server.listen);
        let listen = listen
            .parse()
            .map_err(|e| ConfigError::AddrParse(listen, e))?;

        Ok(Config {
            listen,
            storage_path: cli.storage_path.unwrap_or(toml_config.storage.path),
            mode: cli.mode.unwrap_or(toml_config.server.mode),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    AddrParse(String, std::net::AddrParseError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::AddrParse(addr, e) => {
                write!(f, "Invalid listen address '{addr}': {e}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_cli_args() -> CliArgs {
        CliArgs {
            config: None,
            listen: None,
            storage_path: None,
            mode: None,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.listen, "0.0.0.0:9000");
        assert_eq!(config.server.mode, Mode::Store);
        assert_eq!(config.storage.path, default_storage_path());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "127.0.0.1:9100"
            mode = "drain"

            [storage]
            path = "/var/tmp/echo_store_data.txt"

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:9100");
        assert_eq!(config.server.mode, Mode::Drain);
        assert_eq!(
            config.storage.path,
            PathBuf::from("/var/tmp/echo_store_data.txt")
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_toml_uses_section_defaults() {
        let toml_str = r#"
            [server]
            listen = "127.0.0.1:9100"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.mode, Mode::Store);
        assert_eq!(config.storage.path, default_storage_path());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_resolve_defaults() {
        let config = Config::resolve(no_cli_args()).unwrap();
        assert_eq!(config.listen, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.mode, Mode::Store);
        assert_eq!(config.storage_path, default_storage_path());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_cli_overrides() {
        let cli = CliArgs {
            listen: Some("127.0.0.1:9001".to_string()),
            storage_path: Some(PathBuf::from("/tmp/other.txt")),
            mode: Some(Mode::Drain),
            log_level: "trace".to_string(),
            ..no_cli_args()
        };

        let config = Config::resolve(cli).unwrap();
        assert_eq!(config.listen, "127.0.0.1:9001".parse().unwrap());
        assert_eq!(config.storage_path, PathBuf::from("/tmp/other.txt"));
        assert_eq!(config.mode, Mode::Drain);
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_invalid_listen_address() {
        let cli = CliArgs {
            listen: Some("not-an-address".to_string()),
            ..no_cli_args()
        };

        assert!(matches!(
            Config::resolve(cli),
            Err(ConfigError::AddrParse(_, _))
        ));
    }
}
