//! Block boundary policy.
//!
//! Evaluated at the end of every round, in strict rule order:
//!
//! 1. An unready signer never closes a block. Back-pressure, not failure.
//! 2. A freeze round always closes the block.
//! 3. A zero block period closes every `rounds_per_block` rounds.
//! 4. Otherwise the block closes once consensus time since its first round
//!    exceeds the block period.

use std::time::Duration;

use shared_types::Timestamp;

/// Everything the boundary decision depends on.
#[derive(Clone, Copy, Debug)]
pub struct BoundaryContext {
    /// Number of the round that just ended.
    pub round_number: u64,
    /// Consensus timestamp of the round that just ended.
    pub round_timestamp: Timestamp,
    /// Consensus timestamp of the open block's first round.
    pub block_first_round_timestamp: Timestamp,
    /// Whether a freeze round occurred in the open block.
    pub freeze_pending: bool,
    /// Whether the ledger signer can currently sign.
    pub signer_ready: bool,
}

/// Whether the open block should close after this round.
pub fn should_close_block(
    ctx: &BoundaryContext,
    block_period: Duration,
    rounds_per_block: u64,
) -> bool {
    if !ctx.signer_ready {
        return false;
    }
    if ctx.freeze_pending {
        return true;
    }
    if block_period.is_zero() {
        return ctx.round_number % rounds_per_block == 0;
    }
    ctx.round_timestamp
        .duration_since(&ctx.block_first_round_timestamp)
        > block_period
}
