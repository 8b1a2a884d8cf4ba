//! Pure domain logic: the three satellite managers of the block lifecycle
//! and the block-boundary policy.

pub mod block_hashes;
pub mod boundary;
pub mod pending_proofs;
pub mod running_hash;

pub use block_hashes::BlockHashManager;
pub use boundary::{should_close_block, BoundaryContext};
pub use pending_proofs::{FlushedProof, PendingBlock, PendingProofTracker};
pub use running_hash::RunningHashManager;
