//! Outbound transport port.

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a transport adapter.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    /// Creates a transport error from any displayable cause.
    pub fn new(cause: impl std::fmt::Display) -> Self {
        Self(cause.to_string())
    }
}

/// An established stream to one block node.
///
/// A stream never completes intentionally; adapters must report completion
/// through the pool's error path, same as a transport failure.
#[async_trait]
pub trait NodeStream: Send + Sync {
    /// Sends one batch of bytes down the stream.
    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), TransportError>;
}

/// Opens streams to block nodes.
#[async_trait]
pub trait BlockNodeTransport: Send + Sync {
    /// Connects to the given endpoint.
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn NodeStream>, TransportError>;
}
