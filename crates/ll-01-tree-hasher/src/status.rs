//! Status snapshots and root reconstruction.
//!
//! A [`MerkleTreeStatus`] is the minimal restart state of an incremental
//! tree: the leaf count plus, per level, the root of the rightmost
//! complete-but-unmerged subtree (present exactly when the matching bit of
//! the leaf count is set). [`root_hash_from`] is the companion rule that
//! rebuilds the root after one more leaf without replaying history; the
//! pipeline persists a status at every block close and relies on this rule
//! after restarts.

use shared_crypto::{combine, null_hashes};
use shared_types::{Hash, MerkleTreeStatus};

use crate::error::{Result, TreeHasherError};

/// Reconstructs the root hash of `status.num_leaves + 1` leaves from a
/// status snapshot and the next leaf hash.
///
/// Walking up from the new leaf: at each level, a set bit of the old leaf
/// count means a rightmost subtree exists to combine on the left; a clear
/// bit means the new branch is leftmost and pads with the level's canonical
/// empty hash.
pub fn root_hash_from(status: &MerkleTreeStatus, next_leaf: Hash) -> Result<Hash> {
    let n = status.num_leaves;
    let height = (n + 1).next_power_of_two().trailing_zeros() as usize;
    let nulls = null_hashes(height.max(1));
    let mut hash = next_leaf;
    for level in 0..height {
        if (n >> level) & 1 == 1 {
            let left = status
                .rightmost_hashes
                .get(level)
                .copied()
                .flatten()
                .ok_or(TreeHasherError::InconsistentStatus { level })?;
            hash = combine(&left, &hash);
        } else {
            hash = combine(&hash, &nulls[level]);
        }
    }
    Ok(hash)
}

/// Folds the per-level pending nodes of a drained combiner chain into
/// canonical rightmost hashes.
///
/// Nodes feed a binary-counter accumulator in leaf order: higher levels
/// hold older leaves, so the chain is walked top-down. Two adjacent
/// complete subtrees at the same height always merge, which is exactly the
/// greedy combination an unbatched incremental tree would have performed.
pub(crate) fn rightmost_from_levels(levels: &[(usize, Vec<Hash>)]) -> Vec<Option<Hash>> {
    let mut acc: Vec<Option<Hash>> = Vec::new();
    for (height, nodes) in levels.iter().rev() {
        for &node in nodes {
            push_node(&mut acc, node, *height);
        }
    }
    acc
}

fn push_node(acc: &mut Vec<Option<Hash>>, mut carry: Hash, mut height: usize) {
    loop {
        if acc.len() <= height {
            acc.resize(height + 1, None);
        }
        match acc[height].take() {
            Some(left) => {
                carry = combine(&left, &carry);
                height += 1;
            }
            None => {
                acc[height] = Some(carry);
                return;
            }
        }
    }
}
