//! Configuration loader.
//!
//! A file is only read when one is named explicitly. Nothing is searched for
//! and nothing is written back.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::path::{Path, PathBuf};

/// Configuration loader holding where the configuration came from.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Config file path, if one was loaded
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load from `path` when given, otherwise use the built-in defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Ok(Self::with_defaults()),
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let config = load_from_file(&path)?;
        validate(&config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        Self {
            config_path: None,
            config: Config::default(),
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

/// Reject values serde accepts but the service cannot use.
fn validate(config: &Config) -> ConfigResult<()> {
    if config.scale.baud_rate == 0 {
        return Err(ConfigError::validation(
            "scale.baud_rate",
            "must be a positive integer",
        ));
    }
    if config.scale.timeout.is_zero() {
        return Err(ConfigError::validation(
            "scale.io_timeout_ms",
            "must be greater than zero",
        ));
    }
    if config.scale.read_command.is_empty() {
        return Err(ConfigError::validation(
            "scale.read_command",
            "must not be empty",
        ));
    }
    if config.server.socket_addr().is_err() {
        return Err(ConfigError::validation(
            "server.host",
            format!("'{}' is not a valid IP address", config.server.host),
        ));
    }
    Ok(())
}
