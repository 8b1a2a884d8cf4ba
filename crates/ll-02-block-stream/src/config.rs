//! Configuration for the block stream subsystem.

use serde::Deserialize;
use std::time::Duration;

use crate::error::{BlockStreamError, Result};

/// Block stream configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BlockStreamConfig {
    /// Rounds per block when `block_period` is zero.
    pub rounds_per_block: u64,
    /// Target consensus-time span of one block. Zero selects round-count
    /// boundaries instead.
    #[serde(with = "humantime_serde_compat")]
    pub block_period: Duration,
    /// Pairwise-combine batch size for the Merkle trees. Must be even.
    pub hash_combine_batch_size: usize,
    /// Batch length at which tree combination moves to the worker pool.
    pub combine_offload_threshold: usize,
    /// Items per serialization batch handed to the parallel stage.
    pub serialization_batch_size: usize,
    /// How many finalized block hashes stay queryable.
    pub trailing_block_count: usize,
}

impl Default for BlockStreamConfig {
    fn default() -> Self {
        Self {
            rounds_per_block: 1,
            block_period: Duration::from_secs(2),
            hash_combine_batch_size: 8,
            combine_offload_threshold: 16,
            serialization_batch_size: 32,
            trailing_block_count: 256,
        }
    }
}

impl BlockStreamConfig {
    /// Validates the configuration, failing fast on values the pipeline
    /// cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rounds_per_block == 0 {
            return Err(BlockStreamError::InvalidConfig {
                reason: "rounds_per_block must be at least 1".into(),
            });
        }
        if self.hash_combine_batch_size < 2 || self.hash_combine_batch_size % 2 != 0 {
            return Err(BlockStreamError::InvalidConfig {
                reason: format!(
                    "hash_combine_batch_size {} must be even and at least 2",
                    self.hash_combine_batch_size
                ),
            });
        }
        if self.serialization_batch_size == 0 {
            return Err(BlockStreamError::InvalidConfig {
                reason: "serialization_batch_size must be at least 1".into(),
            });
        }
        if self.trailing_block_count == 0 {
            return Err(BlockStreamError::InvalidConfig {
                reason: "trailing_block_count must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Duration fields deserialize from whole seconds.
mod humantime_serde_compat {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(seconds))
    }
}
