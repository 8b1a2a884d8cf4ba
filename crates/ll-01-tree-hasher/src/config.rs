//! Configuration for the concurrent tree hasher.

use serde::Deserialize;

use crate::error::{Result, TreeHasherError};

/// Tuning knobs for one hasher instance.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct TreeHasherConfig {
    /// Number of hashes buffered per level before pairwise combination.
    /// Must be even so an odd leftover at finalization always pairs with
    /// the level's canonical empty hash.
    pub combine_batch_size: usize,

    /// Batches at least this large combine on the rayon worker pool;
    /// smaller batches combine inline, where scheduling overhead would
    /// dominate.
    pub offload_threshold: usize,
}

impl Default for TreeHasherConfig {
    fn default() -> Self {
        Self {
            combine_batch_size: 8,
            offload_threshold: 16,
        }
    }
}

impl TreeHasherConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.combine_batch_size < 2 || self.combine_batch_size % 2 != 0 {
            return Err(TreeHasherError::InvalidBatchSize {
                got: self.combine_batch_size,
            });
        }
        Ok(())
    }
}
