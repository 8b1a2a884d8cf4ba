//! The concurrent streaming tree hasher.

use std::mem;

use shared_crypto::{empty_leaf_hash, null_hashes};
use shared_types::{Hash, MerkleTreeStatus};

use crate::combiner::{combine_pairs_padded, LevelCombiner};
use crate::config::TreeHasherConfig;
use crate::error::{Result, TreeHasherError};
use crate::status::rightmost_from_levels;
use crate::MAX_TREE_HEIGHT;

/// A concurrent, incremental binary Merkle tree hasher.
///
/// Safe to drive from a single producer while pairwise combination work
/// runs on the rayon pool; results re-enter the chain strictly in batch
/// order, so the root is deterministic regardless of worker scheduling.
pub struct ConcurrentTreeHasher {
    config: TreeHasherConfig,
    leaf_count: u64,
    finalized: bool,
    root: Option<Hash>,
    combiner: LevelCombiner,
}

impl ConcurrentTreeHasher {
    /// Creates a hasher, validating the configuration.
    pub fn new(config: TreeHasherConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            leaf_count: 0,
            finalized: false,
            root: None,
            combiner: LevelCombiner::new(0, config.combine_batch_size, config.offload_threshold),
        })
    }

    /// Appends one leaf hash.
    ///
    /// Fails once the root has been requested; finalization is terminal.
    pub fn add_leaf(&mut self, leaf: Hash) -> Result<()> {
        if self.finalized {
            return Err(TreeHasherError::AlreadyFinalized);
        }
        self.leaf_count += 1;
        self.combiner.add(leaf);
        Ok(())
    }

    /// Number of leaves added so far.
    pub fn leaf_count(&self) -> u64 {
        self.leaf_count
    }

    /// Whether the root has been requested.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Finalizes the tree and returns its root hash. Idempotent.
    ///
    /// An empty tree hashes to the canonical empty-leaf hash, not to any
    /// combined value.
    pub async fn root_hash(&mut self) -> Hash {
        if let Some(root) = self.root {
            return root;
        }
        self.finalized = true;
        let root = if self.leaf_count == 0 {
            empty_leaf_hash()
        } else {
            let chain = mem::replace(
                &mut self.combiner,
                LevelCombiner::new(0, self.config.combine_batch_size, self.config.offload_threshold),
            );
            finalize_chain(chain).await
        };
        self.root = Some(root);
        root
    }

    /// Snapshot sufficient to resume hashing after a restart.
    ///
    /// Drains all in-flight combination work first; the snapshot is read
    /// once per block close, so the hot `add_leaf` path carries no status
    /// bookkeeping.
    pub async fn status(&mut self) -> MerkleTreeStatus {
        drain_chain(&mut self.combiner).await;
        let mut levels: Vec<(usize, Vec<Hash>)> = Vec::new();
        let mut cursor = Some(&self.combiner);
        while let Some(level) = cursor {
            levels.push((level.height, level.pending.clone()));
            cursor = level.next.as_deref();
        }
        MerkleTreeStatus {
            num_leaves: self.leaf_count,
            rightmost_hashes: rightmost_from_levels(&levels),
        }
    }
}

/// Awaits every scheduled batch in the chain, bottom-up, forwarding results
/// upward in order. Pending partial batches are left in place.
async fn drain_chain(level: &mut LevelCombiner) {
    level.drain_scheduled().await;
    if let Some(next) = level.next.as_deref_mut() {
        Box::pin(drain_chain(next)).await;
    }
}

/// Consumes the combiner chain bottom-up: flush in-flight batches, pad and
/// combine each level's partial remainder, and return the surviving hash.
async fn finalize_chain(mut level: LevelCombiner) -> Hash {
    let nulls = null_hashes(MAX_TREE_HEIGHT);
    loop {
        level.drain_scheduled().await;
        let pending = mem::take(&mut level.pending);
        match level.next.take() {
            Some(mut next) => {
                if !pending.is_empty() {
                    next.add_all(&combine_pairs_padded(&pending, &nulls[level.height]));
                }
                level = *next;
            }
            None => {
                let mut nodes = pending;
                let mut height = level.height;
                while nodes.len() > 1 {
                    nodes = combine_pairs_padded(&nodes, &nulls[height]);
                    height += 1;
                }
                debug_assert!(!nodes.is_empty(), "finalized a chain with no nodes");
                return nodes[0];
            }
        }
    }
}
