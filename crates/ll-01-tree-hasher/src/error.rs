//! Error types for the tree hasher.

use thiserror::Error;

/// Result type alias for tree hasher operations.
pub type Result<T> = std::result::Result<T, TreeHasherError>;

/// Errors that can occur while building a Merkle tree.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeHasherError {
    /// A leaf was added after the root hash was requested.
    #[error("tree already finalized: no further leaves may be added")]
    AlreadyFinalized,

    /// The configured combine batch size is odd or too small.
    #[error("invalid combine batch size {got}: must be even and at least 2")]
    InvalidBatchSize {
        /// Configured batch size.
        got: usize,
    },

    /// A status snapshot is missing the rightmost hash a set bit of its
    /// leaf count requires.
    #[error("inconsistent tree status: missing rightmost hash at level {level}")]
    InconsistentStatus {
        /// Tree level with the missing hash.
        level: usize,
    },
}
