//! Error types for the block node connection pool.

use thiserror::Error;

/// Result type alias for connection pool operations.
pub type Result<T> = std::result::Result<T, BlockNodeError>;

/// Errors that can occur managing block node connections.
#[derive(Debug, Error)]
pub enum BlockNodeError {
    /// A configuration value failed validation.
    #[error("invalid block node configuration: {reason}")]
    InvalidConfig {
        /// What was wrong.
        reason: String,
    },

    /// An operation referenced an endpoint the pool does not know.
    #[error("unknown block node endpoint: {endpoint}")]
    UnknownEndpoint {
        /// The unrecognized endpoint.
        endpoint: String,
    },
}
