//! Configuration management for feedshelf.
//!
//! Configuration is read from `~/.config/feedshelf/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

pub mod database;
pub mod fetch;

pub use database::DatabaseConfig;
pub use fetch::FetchConfig;

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Main configuration struct.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// User id used when `--user` is not given on the command line.
    pub default_user: i64,
    pub database: DatabaseConfig,
    pub fetcher: FetchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_user: 1,
            database: DatabaseConfig::default(),
            fetcher: FetchConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, creating it when missing.
    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            Self::create_default_config(config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::Io {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source: e,
        })?;

        tracing::debug!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }

    /// Get the default config file path: `~/.config/feedshelf/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("feedshelf").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        tracing::info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# feedshelf configuration

# User id used when --user is not passed on the command line
default_user = 1

[database]
# Database file (default: <data dir>/feedshelf/feedshelf.db)
# path = "/home/me/.local/share/feedshelf/feedshelf.db"

# How long SQLite waits on a locked database before giving up (milliseconds)
busy_timeout_ms = 5000

# Retries for idempotent operations that fail with a busy/locked database
max_attempts = 3

# First retry delay in milliseconds, doubled on every further attempt
base_delay_ms = 50

[fetcher]
# Maximum number of sources fetched concurrently by `feedshelf refresh`
workers = 10

# Per-request timeout in seconds
timeout_secs = 10

# User-Agent header sent with every request (default: feedshelf/<version>)
# user_agent = "feedshelf/0.1.0"
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_default_config_documents_every_fetcher_key() {
        let content = Config::default_config_content();
        for key in ["workers =", "timeout_secs =", "# user_agent ="] {
            assert!(content.contains(key), "missing {}", key);
        }
    }

    #[test]
    fn test_user_agent_override() {
        let config: Config = toml::from_str("[fetcher]\nuser_agent = \"reader/2\"").unwrap();
        assert_eq!(config.fetcher.user_agent, "reader/2");
        assert_eq!(config.fetcher.workers, FetchConfig::default().workers);
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
default_user = 7

[database]
max_attempts = 5
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        // Custom values
        assert_eq!(config.default_user, 7);
        assert_eq!(config.database.max_attempts, 5);
        // Defaults
        assert_eq!(config.database.base_delay_ms, 50);
        assert_eq!(config.fetcher, FetchConfig::default());
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");
        assert_eq!(config.default_user, 1);
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        // Second load parses the file that was just written
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, Config::default());
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "default_user = \"not a number\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
