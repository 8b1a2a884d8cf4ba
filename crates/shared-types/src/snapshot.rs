//! # Persisted Chain State
//!
//! The [`ChainSnapshot`] is written at every block close and loaded once at
//! node startup. It carries exactly the state needed to resume the stream
//! without replaying history: the trailing block-hash window, the four-slot
//! trailing result hashes, and the output tree status for the block that
//! just closed.

use serde::{Deserialize, Serialize};

use crate::entities::{SemanticVersion, Timestamp};
use crate::hash::Hash;

/// Snapshot of an incremental Merkle tree, sufficient to recompute the root
/// after appending one more leaf without replaying prior leaves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTreeStatus {
    /// Number of leaves hashed so far.
    pub num_leaves: u64,
    /// One entry per tree level: the root of the rightmost complete-but-
    /// unmerged subtree at that level, present exactly when the matching bit
    /// of `num_leaves` is set.
    pub rightmost_hashes: Vec<Option<Hash>>,
}

/// Chain state persisted at every block close.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    /// Number of the block this snapshot closed.
    pub block_number: u64,
    /// Consensus timestamp of the block's first round.
    pub block_timestamp: Timestamp,
    /// Trailing finalized block hashes, oldest first, bounded by
    /// configuration.
    pub trailing_block_hashes: Vec<Hash>,
    /// Trailing result hashes (at most four), oldest first.
    pub trailing_result_hashes: Vec<Hash>,
    /// Root of the closed block's input tree.
    pub input_tree_root: Hash,
    /// State root hash at the start of the closed block.
    pub start_of_block_state_hash: Hash,
    /// Status of the closed block's output tree.
    pub output_tree_status: MerkleTreeStatus,
    /// Software version that wrote the snapshot.
    pub software_version: SemanticVersion,
}

impl ChainSnapshot {
    /// The genesis snapshot: no history, block numbering starts at one.
    pub fn genesis(software_version: SemanticVersion) -> Self {
        Self {
            block_number: 0,
            block_timestamp: Timestamp::default(),
            trailing_block_hashes: Vec::new(),
            trailing_result_hashes: Vec::new(),
            input_tree_root: Hash::default(),
            start_of_block_state_hash: Hash::default(),
            output_tree_status: MerkleTreeStatus::default(),
            software_version,
        }
    }

    /// A genesis-like snapshot that resumes numbering after `block_number`.
    pub fn resuming_from(block_number: u64, software_version: SemanticVersion) -> Self {
        Self {
            block_number,
            ..Self::genesis(software_version)
        }
    }
}
