//! # Core Domain Entities
//!
//! The block-item union and its payload types, plus the round descriptor
//! supplied by the consensus layer.
//!
//! ## Entities
//!
//! - [`BlockItem`]: the discriminated union streamed into a block
//! - [`BlockHeader`] / [`BlockProof`]: the first and last item of every block
//! - [`RoundInfo`]: one unit of externally supplied consensus progress
//!
//! Item payloads are carried as opaque serialized bytes; the transaction-type
//! specific translation into those bytes happens upstream and is not a
//! concern of the stream core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::hash::Hash;

/// Software version recorded in every block header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
}

impl SemanticVersion {
    /// Creates a new version triple.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A consensus timestamp: seconds since the epoch plus nanoseconds.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Timestamp {
    /// Whole seconds since the Unix epoch.
    pub seconds: i64,
    /// Nanosecond remainder, `0..1_000_000_000`.
    pub nanos: i32,
}

impl Timestamp {
    /// Creates a timestamp from seconds and nanos.
    pub const fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Consensus time elapsed since `earlier`, saturating to zero when
    /// `earlier` is not actually earlier.
    pub fn duration_since(&self, earlier: &Timestamp) -> Duration {
        let secs = self.seconds - earlier.seconds;
        let nanos = i64::from(self.nanos) - i64::from(earlier.nanos);
        let total = secs * 1_000_000_000 + nanos;
        if total <= 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(total as u64)
        }
    }
}

/// Hash algorithm tag recorded in block headers.
///
/// Only SHA2-384 is defined today; the tag exists so the wire format does
/// not need to change if that ever does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA2-384, 48-byte digests.
    #[default]
    Sha2_384,
}

/// The first item of every block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block number, strictly increasing by one.
    pub number: u64,
    /// Root hash of the previous block.
    pub previous_block_hash: Hash,
    /// Hash algorithm used throughout the block.
    pub hash_algorithm: HashAlgorithm,
    /// Software version that produced the block.
    pub software_version: SemanticVersion,
    /// Consensus timestamp of the block's first transaction. Deferred until
    /// that transaction arrives, unless the block was opened with an
    /// unavailable signer.
    pub first_transaction_time: Option<Timestamp>,
}

/// Header of a consensus event within a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventHeader {
    /// Serialized event core.
    pub event_core: Vec<u8>,
    /// Creator signature over the event.
    pub signature: Vec<u8>,
}

/// A single transaction as it reached consensus.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTransaction {
    /// Consensus timestamp assigned to this transaction.
    pub consensus_timestamp: Timestamp,
    /// Serialized signed transaction.
    pub transaction: Vec<u8>,
}

/// The result of handling one transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    /// Consensus timestamp of the handled transaction.
    pub consensus_timestamp: Timestamp,
    /// Serialized result record.
    pub result: Vec<u8>,
}

/// Side output of handling one transaction (call results, receipts).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    /// Serialized output record.
    pub output: Vec<u8>,
}

/// A batch of key-value, map, or queue state mutations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChanges {
    /// Consensus timestamp the changes were committed at.
    pub consensus_timestamp: Timestamp,
    /// Serialized change records.
    pub changes: Vec<u8>,
}

/// Marks the start of a consensus round within the block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundHeader {
    /// Round number.
    pub round_number: u64,
}

/// A sibling hash needed to verify an indirect block proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleSiblingHash {
    /// Whether the sibling is the first child of its parent.
    pub is_first: bool,
    /// The sibling hash value.
    pub hash: Hash,
}

/// The last item of every block: the cryptographic proof of its root hash.
///
/// A direct proof carries a signature over this block's own hash and no
/// sibling hashes. An indirect proof carries a signature over a later
/// block's hash plus the sibling-hash chain connecting the two.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProof {
    /// Number of the proven block.
    pub block: u64,
    /// Root hash of the previous block.
    pub previous_block_root_hash: Hash,
    /// State root hash at the start of the proven block.
    pub start_of_block_state_root_hash: Hash,
    /// Ledger signature over the proven (or a later) block hash.
    pub signature: Vec<u8>,
    /// Sibling hashes for indirect proofs; empty for direct proofs.
    pub sibling_hashes: Vec<MerkleSiblingHash>,
}

/// One item of the block stream.
///
/// Immutable once constructed. Input items feed the input Merkle tree,
/// output items feed the output Merkle tree, and transaction results
/// additionally feed the running hash chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockItem {
    /// Block header, always the first item.
    Header(BlockHeader),
    /// Event header (input).
    EventHeader(EventHeader),
    /// Event transaction (input).
    EventTransaction(EventTransaction),
    /// Transaction result (output, also chained into the running hash).
    TransactionResult(TransactionResult),
    /// Transaction output (output).
    TransactionOutput(TransactionOutput),
    /// State changes (output).
    StateChanges(StateChanges),
    /// Block proof, always the last item.
    BlockProof(BlockProof),
    /// Round header.
    RoundHeader(RoundHeader),
}

impl BlockItem {
    /// Whether this item is a leaf of the input Merkle tree.
    pub fn is_input(&self) -> bool {
        matches!(self, Self::EventHeader(_) | Self::EventTransaction(_))
    }

    /// Whether this item is a leaf of the output Merkle tree.
    pub fn is_output(&self) -> bool {
        matches!(
            self,
            Self::TransactionResult(_) | Self::TransactionOutput(_) | Self::StateChanges(_)
        )
    }

    /// Whether this item also feeds the running result-hash chain.
    pub fn is_transaction_result(&self) -> bool {
        matches!(self, Self::TransactionResult(_))
    }
}

/// One unit of externally supplied consensus progress. One or more rounds
/// compose a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfo {
    /// Round number, strictly increasing.
    pub number: u64,
    /// Consensus timestamp of the round.
    pub consensus_timestamp: Timestamp,
    /// Whether this round precedes a freeze. Freeze rounds always end a
    /// block.
    pub is_freeze_round: bool,
}
