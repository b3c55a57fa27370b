//! Database section of the configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Where the SQLite database lives and how transient errors are retried.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file. `None` means `<data dir>/feedshelf/feedshelf.db`.
    pub path: Option<PathBuf>,
    /// SQLite busy handler timeout in milliseconds.
    pub busy_timeout_ms: u64,
    /// Attempts for idempotent operations that hit a busy/locked database.
    pub max_attempts: u32,
    /// First backoff delay; doubled on each further attempt.
    pub base_delay_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: 5000,
            max_attempts: 3,
            base_delay_ms: 50,
        }
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}
