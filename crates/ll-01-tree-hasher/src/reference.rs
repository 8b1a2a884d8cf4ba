//! Naive sequential reference hasher.
//!
//! Keeps every leaf and recomputes the whole tree on demand. Far too slow
//! for production blocks but the ground truth the concurrent hasher is
//! differential-tested against.

use shared_crypto::{combine, empty_leaf_hash, null_hashes};
use shared_types::Hash;

/// A sequential pairwise-combine-with-padding Merkle hasher.
#[derive(Default)]
pub struct NaiveTreeHasher {
    leaves: Vec<Hash>,
}

impl NaiveTreeHasher {
    /// Creates an empty hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one leaf.
    pub fn add_leaf(&mut self, leaf: Hash) {
        self.leaves.push(leaf);
    }

    /// Number of leaves added.
    pub fn leaf_count(&self) -> u64 {
        self.leaves.len() as u64
    }

    /// Root of a perfect tree of `next_power_of_two(N)` leaves, right-padded
    /// with the canonical empty-leaf hash.
    pub fn root_hash(&self) -> Hash {
        if self.leaves.is_empty() {
            return empty_leaf_hash();
        }
        let target = self.leaves.len().next_power_of_two();
        let nulls = null_hashes(1);
        let mut nodes = self.leaves.clone();
        nodes.resize(target, nulls[0]);
        while nodes.len() > 1 {
            nodes = nodes
                .chunks_exact(2)
                .map(|pair| combine(&pair[0], &pair[1]))
                .collect();
        }
        nodes[0]
    }
}
