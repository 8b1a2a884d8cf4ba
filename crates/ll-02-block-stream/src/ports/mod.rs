//! Hexagonal architecture ports for the block stream subsystem.

pub mod outbound;

pub use outbound::{
    BlockItemWriter, BlockItemWriterFactory, BlockSigner, ChainStateStore, PortError,
};
