//! # Lattice-Ledger - Tree Hasher (Subsystem 01)
//!
//! A concurrent, incremental, restartable binary Merkle tree hasher. Two
//! instances run per block: one over input items, one over output items.
//!
//! ## Design
//!
//! Leaves buffer into even-sized batches inside a chain of per-level
//! combiners. A full batch combines pairwise - inline for small batches,
//! on the rayon worker pool for large ones - and the combined hashes flow
//! into the next level's combiner of identical structure. Finalization
//! walks the chain bottom-up, padding incomplete levels with the canonical
//! empty-subtree hash for that level, so the root of N leaves always equals
//! the root of a perfect tree of `next_power_of_two(N)` leaves.
//!
//! ## Critical Invariants
//!
//! 1. **Terminal finalization**: once the root has been requested, no
//!    further leaves may be added.
//! 2. **Even batches**: the combine batch size is even, so an odd leftover
//!    at any level always pairs with a well-defined canonical empty hash.
//! 3. **Restartability**: a [`MerkleTreeStatus`] taken after N leaves plus
//!    the hash of leaf N+1 reconstructs the root of N+1 leaves without
//!    replaying history (see [`root_hash_from`]).
//! 4. **Empty tree**: zero leaves hash to the canonical empty-leaf hash,
//!    never to a combined value.
//!
//! [`MerkleTreeStatus`]: shared_types::MerkleTreeStatus

#![warn(missing_docs)]
#![warn(clippy::all)]

mod combiner;
mod config;
mod error;
mod hasher;
pub mod reference;
mod status;

pub use config::TreeHasherConfig;
pub use error::{Result, TreeHasherError};
pub use hasher::ConcurrentTreeHasher;
pub use status::root_hash_from;

/// Deepest tree supported; 2^64 leaves is unreachable in practice.
pub(crate) const MAX_TREE_HEIGHT: usize = 64;
