//! # Unified Test Suite
//!
//! Cross-crate integration tests for the block stream core, driven through
//! fake implementations of the outbound ports.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! └── src/
//!     ├── lib.rs         # This file
//!     ├── fakes.rs       # Fake port implementations shared by all flows
//!     ├── ordering.rs    # Write-order guarantees under parallel latency
//!     ├── block_flow.rs  # Round-driven block lifecycle and boundaries
//!     ├── proof_flow.rs  # Direct and indirect proof finalization
//!     └── connections.rs # Block node pool flows
//! ```

pub mod fakes;

pub mod block_flow;
pub mod connections;
pub mod ordering;
pub mod proof_flow;
