//! # Shared Crypto Crate
//!
//! SHA-384 primitives for the block stream. Every hash in the system is a
//! 48-byte SHA-384 digest, and every composition is concatenate-then-hash.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod hashing;

pub use hashing::{combine, empty_leaf_hash, null_hashes, sha384};
