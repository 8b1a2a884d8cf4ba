//! Outbound ports: the stream writer, the ledger signer, and the durable
//! chain-state store.

use async_trait::async_trait;
use thiserror::Error;

use shared_types::{ChainSnapshot, Hash};

/// Failure reported by an outbound adapter.
///
/// Adapters fold their transport-specific errors into this one shape; the
/// service decides recoverability, not the adapter.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PortError(pub String);

impl PortError {
    /// Creates a port error from any displayable cause.
    pub fn new(cause: impl std::fmt::Display) -> Self {
        Self(cause.to_string())
    }
}

/// Order-preserving sink for one block's serialized items.
///
/// A writer belongs to exactly one block. `write_items` calls must land in
/// the stream in call order with nothing dropped; any error poisons the
/// block, since a stream with a hole cannot be proven.
#[async_trait]
pub trait BlockItemWriter: Send + Sync {
    /// Appends serialized item frames to the block, in order.
    async fn write_items(&mut self, frames: Vec<Vec<u8>>) -> Result<(), PortError>;

    /// Completes the block. No writes may follow.
    async fn close_block(&mut self) -> Result<(), PortError>;
}

/// Allocates one [`BlockItemWriter`] per block.
#[async_trait]
pub trait BlockItemWriterFactory: Send + Sync {
    /// Opens a writer for the given block number.
    async fn open_block(&self, block_number: u64) -> Result<Box<dyn BlockItemWriter>, PortError>;
}

/// The ledger signature provider.
///
/// Readiness may flip over the node's lifetime; an unready signer exerts
/// back-pressure on block closure rather than failing it.
#[async_trait]
pub trait BlockSigner: Send + Sync {
    /// Whether the signer can currently produce signatures.
    async fn is_ready(&self) -> bool;

    /// Signs a block hash. The signature may arrive for a later block than
    /// the one awaiting it; proof tracking resolves that.
    async fn sign(&self, hash: Hash) -> Result<Vec<u8>, PortError>;
}

/// Durable store for the per-block chain snapshot.
#[async_trait]
pub trait ChainStateStore: Send + Sync {
    /// Commits the snapshot for a just-closed block. Called exactly once
    /// per close; failure is fatal to the node.
    async fn commit(&self, snapshot: &ChainSnapshot) -> Result<(), PortError>;
}
