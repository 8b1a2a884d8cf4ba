//! Error types for the block stream subsystem.

use thiserror::Error;

/// Result type alias for block stream operations.
pub type Result<T> = std::result::Result<T, BlockStreamError>;

/// Errors that can occur while assembling and proving blocks.
#[derive(Debug, Error)]
pub enum BlockStreamError {
    /// A round arrived before `init_last_block_hash` was called.
    #[error("block stream not initialized: last block hash missing")]
    NotInitialized,

    /// An item or closure request arrived with no block open.
    #[error("no block open for round {round}")]
    NoOpenBlock {
        /// Round number of the offending request.
        round: u64,
    },

    /// Committing the chain snapshot failed. The node cannot continue
    /// without durable chain state.
    #[error("failed to commit chain snapshot for block {block}: {reason}")]
    StateCommitFailed {
        /// Block whose snapshot failed to commit.
        block: u64,
        /// Store-reported failure.
        reason: String,
    },

    /// The block's item writer failed. Every item of a block must reach
    /// the stream, so the block cannot close.
    #[error("item writer failed for block {block}: {reason}")]
    WriterFailed {
        /// Block whose writer failed.
        block: u64,
        /// Writer-reported failure.
        reason: String,
    },

    /// Opening a writer for a new block failed.
    #[error("failed to open item writer for block {block}: {reason}")]
    WriterOpenFailed {
        /// Block the writer was being opened for.
        block: u64,
        /// Factory-reported failure.
        reason: String,
    },

    /// The start-of-block state hash channel closed before delivering.
    #[error("start-of-block state hash unavailable for round {round}")]
    StateHashUnavailable {
        /// Round whose end-of-round state hash never arrived.
        round: u64,
    },

    /// Signing the block hash failed.
    #[error("block signing failed for block {block}: {reason}")]
    SigningFailed {
        /// Block whose hash could not be signed.
        block: u64,
        /// Signer-reported failure.
        reason: String,
    },

    /// A configuration value failed validation.
    #[error("invalid block stream configuration: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },

    /// Tree hasher failure.
    #[error("tree hasher error: {0}")]
    TreeHasher(#[from] ll_01_tree_hasher::TreeHasherError),
}

impl BlockStreamError {
    /// Whether the error means the node must halt. Losing the chain
    /// snapshot or a block's items cannot be recovered from in-process.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::StateCommitFailed { .. } | Self::WriterFailed { .. }
        )
    }

    /// Whether normal operation can continue past the error.
    pub fn is_recoverable(&self) -> bool {
        !self.is_fatal()
    }
}
