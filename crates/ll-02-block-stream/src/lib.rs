//! # Lattice Ledger - Block Stream (Subsystem 02)
//!
//! Assembles consensus output into the verifiable block stream: one block
//! per boundary, every item serialized and written in submission order, a
//! Merkle proof closing each block.
//!
//! ## Design
//!
//! Rounds drive the lifecycle. `start_round` opens a block if none is
//! open; `write_item` streams items through a two-stage pipeline (parallel
//! serialize-and-hash on the worker pool, then a strictly ordered
//! sequential stage feeding the Merkle trees, the running hashes, and the
//! item writer); `end_round` consults the boundary policy and closes the
//! block when it says so.
//!
//! Closing computes the block hash as a four-leaf tree over the previous
//! block hash, the input tree root, the output tree root, and the
//! start-of-block state hash. The closed block then waits in the pending
//! proof queue: its own signature proves it directly, and a later block's
//! signature proves it indirectly through sibling hashes.
//!
//! ## Critical Invariants
//!
//! 1. **Write Order**: frames reach the writer in exact submission order,
//!    independent of parallel-stage completion order.
//! 2. **Header First**: the block header is the first frame of every
//!    block, stamped with the first transaction's consensus time when one
//!    arrives before the first flush.
//! 3. **Proof Last**: exactly one proof frame ends every block, written
//!    only after a covering signature exists.
//! 4. **Durable Close**: the chain snapshot commits before the block is
//!    queued for proving; a failed commit is fatal.
//!
//! ## Module Structure
//!
//! - [`domain`]: boundary policy, running hashes, trailing block hashes,
//!   pending proof tracking
//! - [`ports`]: outbound interfaces (writer, signer, state store)
//! - [`service`]: the orchestrating state machine

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod ports;
pub mod service;

mod config;
mod error;
mod metrics;
mod pipeline;

pub use config::BlockStreamConfig;
pub use error::{BlockStreamError, Result};
pub use metrics::Metrics;
pub use service::{BlockStreamService, InitialStateHash};

pub use domain::{PendingBlock, PendingProofTracker};

/// Subsystem identifier.
pub const SUBSYSTEM_ID: u8 = 2;
