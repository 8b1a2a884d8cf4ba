//! # Shared Types Crate
//!
//! Cross-subsystem domain types for the Lattice-Ledger block stream:
//! the 48-byte SHA-384 [`Hash`] value type, the [`BlockItem`] union that
//! every subsystem speaks, block proofs, and the persisted [`ChainSnapshot`].
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Closed Unions**: `BlockItem` is a tagged enum constructed once per
//!   item, never a mutable builder shared across call sites.
//! - **Immutable Once Constructed**: Items and snapshots are plain data; all
//!   lifecycle state lives in the subsystem that owns it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod entities;
pub mod errors;
pub mod hash;
pub mod snapshot;

pub use entities::*;
pub use errors::SharedTypesError;
pub use hash::{decode_hashes, encode_hashes, Hash, HASH_SIZE, ZERO_HASH};
pub use snapshot::{ChainSnapshot, MerkleTreeStatus};
