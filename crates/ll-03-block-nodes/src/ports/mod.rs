//! Hexagonal architecture ports for the connection pool.

pub mod outbound;

pub use outbound::{BlockNodeTransport, NodeStream, TransportError};
