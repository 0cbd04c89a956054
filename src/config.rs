//! Configuration management for the sandbox explorer
//!
//! Defaults, then an optional `config.toml`, then `FILE_EXPLORER_*`
//! environment variables, in increasing order of precedence.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "FILE_EXPLORER";
const CONFIG_FILE: &str = "config";
pub const DEFAULT_ROOT: &str = "files-default";

/// Complete explorer configuration, loaded once at startup
#[derive(Debug, Deserialize, Clone)]
pub struct ExplorerConfig {
    /// IP address to bind the command listener
    pub bind_address: String,

    /// Port for the command listener (0 picks a free port)
    pub port: u16,

    /// Directory every operation is confined to
    pub root_path: String,

    /// Maximum concurrent connections
    pub max_clients: usize,

    /// Maximum upload size in MB
    pub max_file_size_mb: u64,

    /// Maximum length of a single command line in bytes
    pub max_command_length: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 2121,
            root_path: DEFAULT_ROOT.to_string(),
            max_clients: 10,
            max_file_size_mb: 100,
            max_command_length: 4096,
        }
    }
}

impl ExplorerConfig {
    /// Load configuration from `config.toml` (if present) with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(File::with_name(CONFIG_FILE).required(false))
    }

    fn load_from(file: File<config::FileSourceFile, config::FileFormat>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let settings = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("root_path", defaults.root_path)?
            .set_default("max_clients", defaults.max_clients as i64)?
            .set_default("max_file_size_mb", defaults.max_file_size_mb as i64)?
            .set_default("max_command_length", defaults.max_command_length as i64)?
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: ExplorerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root_path.trim().is_empty() {
            return Err(ConfigError::Message("root_path cannot be empty".into()));
        }

        if self.max_clients == 0 {
            return Err(ConfigError::Message(
                "max_clients must be greater than 0".into(),
            ));
        }

        if self.max_file_size_mb == 0 {
            return Err(ConfigError::Message(
                "max_file_size_mb must be greater than 0".into(),
            ));
        }

        if self.max_command_length == 0 {
            return Err(ConfigError::Message(
                "max_command_length must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Bind address and port as a socket address string
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn root_path(&self) -> PathBuf {
        PathBuf::from(&self.root_path)
    }

    /// Maximum upload size in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}
