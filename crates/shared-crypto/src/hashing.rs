//! # SHA-384 Hashing
//!
//! One-shot digests, pair combination, and the canonical empty-subtree
//! ladder used to pad incomplete Merkle trees.
//!
//! A fresh `Sha384` context is constructed per call: the digest is stateless
//! and cheap to create, which keeps these helpers free of hidden mutable
//! state shared across threads.

use sha2::{Digest, Sha384};
use shared_types::Hash;

/// One-shot SHA-384 digest.
pub fn sha384(data: &[u8]) -> Hash {
    let digest = Sha384::digest(data);
    let mut hash = [0u8; 48];
    hash.copy_from_slice(&digest);
    Hash(hash)
}

/// Combines two hashes: `SHA384(left || right)`.
pub fn combine(left: &Hash, right: &Hash) -> Hash {
    let mut hasher = Sha384::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    let digest = hasher.finalize();
    let mut hash = [0u8; 48];
    hash.copy_from_slice(&digest);
    Hash(hash)
}

/// The canonical empty-leaf hash: the digest of zero-length input.
pub fn empty_leaf_hash() -> Hash {
    sha384(&[])
}

/// The canonical empty-subtree ladder: `null[0]` is the empty-leaf hash and
/// `null[h + 1] = combine(null[h], null[h])`. An incomplete tree level `h`
/// is always padded with `null[h]`.
pub fn null_hashes(levels: usize) -> Vec<Hash> {
    let mut ladder = Vec::with_capacity(levels);
    let mut current = empty_leaf_hash();
    for _ in 0..levels {
        ladder.push(current);
        current = combine(&current, &current);
    }
    ladder
}
