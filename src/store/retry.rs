//! Retry of idempotent store operations on a busy or locked database.

use std::thread;
use std::time::Duration;

use crate::app::Result;
use crate::config::DatabaseConfig;

const MAX_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
        }
    }

    /// Exponential backoff: base * 2^attempt, capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1_u32 << attempt.min(10);
        self.base_delay.saturating_mul(factor).min(MAX_DELAY)
    }

    /// Run `op`, retrying while it fails with a transient error.
    ///
    /// Only pass operations that are safe to repeat: reads, keyed upserts,
    /// deletes. The closure must acquire and release the connection itself
    /// so the lock is not held while sleeping. Backoff blocks the calling
    /// thread; async callers go through `spawn_blocking`.
    pub fn run<T, F>(&self, op_name: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            match op() {
                Err(e) if e.is_transient() && attempt + 1 < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "{} failed with {} (attempt {}), retrying in {:?}",
                        op_name,
                        e,
                        attempt + 1,
                        delay
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
