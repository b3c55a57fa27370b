//! Feed refresh section of the configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::fetcher::parallel::DEFAULT_WORKERS;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum concurrent source fetches during a refresh
    pub workers: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout_secs: 10,
            user_agent: concat!("feedshelf/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
