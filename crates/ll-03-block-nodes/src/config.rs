//! Configuration for the block node connection pool.

use serde::Deserialize;
use std::time::Duration;

use crate::error::{BlockNodeError, Result};

/// One downstream block node.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct BlockNodeConfig {
    /// Endpoint address, unique within the pool.
    pub endpoint: String,
    /// Selection priority; lower connects first.
    pub priority: i32,
    /// Preferred nodes connect unconditionally and survive reselection.
    #[serde(default)]
    pub preferred: bool,
    /// Items per send batch on this node's stream.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    256
}

/// Pool-level tuning.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ConnectionPoolConfig {
    /// Cap on simultaneously connected non-preferred nodes.
    pub max_secondary_connections: usize,
    /// Interval between reselections of non-preferred connections, in
    /// seconds.
    pub reselection_interval_secs: u64,
    /// Retries per node before it is abandoned for the session.
    pub max_retry_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Multiplier applied to the delay on each further retry.
    pub retry_backoff_multiplier: f64,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_secondary_connections: 3,
            reselection_interval_secs: 3600,
            max_retry_attempts: 5,
            initial_retry_delay_ms: 1000,
            retry_backoff_multiplier: 2.0,
        }
    }
}

impl ConnectionPoolConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.retry_backoff_multiplier < 1.0 {
            return Err(BlockNodeError::InvalidConfig {
                reason: format!(
                    "retry_backoff_multiplier {} must be at least 1.0",
                    self.retry_backoff_multiplier
                ),
            });
        }
        if self.reselection_interval_secs == 0 {
            return Err(BlockNodeError::InvalidConfig {
                reason: "reselection_interval_secs must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Interval between reselections.
    pub fn reselection_interval(&self) -> Duration {
        Duration::from_secs(self.reselection_interval_secs)
    }

    /// Delay before retry number `attempt` (1-based):
    /// `initial * multiplier^(attempt - 1)`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = self
            .retry_backoff_multiplier
            .powi(attempt.saturating_sub(1) as i32);
        Duration::from_millis((self.initial_retry_delay_ms as f64 * factor) as u64)
    }
}
