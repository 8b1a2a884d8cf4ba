//! # Lattice Ledger - Block Node Connections (Subsystem 03)
//!
//! Maintains the streams that carry finished blocks to downstream block
//! nodes.
//!
//! ## Design
//!
//! Every preferred node gets a connection unconditionally. Non-preferred
//! nodes compete for a bounded number of secondary slots, filled in
//! ascending priority order with random tie-breaking inside a tier, and
//! are torn down and reselected on a timer so the node does not stick to
//! an early choice forever.
//!
//! A stream to a block node has no intentional end, so stream completion
//! takes the same path as a transport failure: one retry per failure with
//! exponential backoff, then session-long abandonment once the budget is
//! spent, with the freed slot going to the next candidate immediately.
//!
//! ## Critical Invariants
//!
//! 1. **Budget**: connected non-preferred nodes never exceed the
//!    configured secondary cap.
//! 2. **Preferred Stability**: reselection never touches a preferred
//!    connection.
//! 3. **Single Retry**: each failure schedules exactly one retry; no
//!    retry storms.
//! 4. **Caller Isolation**: broadcast never surfaces per-stream failures;
//!    they route into the retry path.
//!
//! ## Module Structure
//!
//! - [`domain`]: connection states and candidate selection
//! - [`ports`]: the transport interface
//! - [`service`]: the pool manager

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod ports;
pub mod service;

mod config;
mod error;
mod metrics;

pub use config::{BlockNodeConfig, ConnectionPoolConfig};
pub use domain::ConnectionState;
pub use error::{BlockNodeError, Result};
pub use metrics::Metrics;
pub use service::ConnectionPoolManager;

/// Subsystem identifier.
pub const SUBSYSTEM_ID: u8 = 3;
