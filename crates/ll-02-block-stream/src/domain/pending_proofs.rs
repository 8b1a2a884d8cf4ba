//! Tracking of closed-but-unproven blocks.
//!
//! Blocks close faster than the ledger signs them, so closed blocks queue
//! here with their writer until a signature arrives. A signature over a
//! later block's hash proves every earlier pending block indirectly: the
//! verifier climbs from the earlier block hash to the signed one using the
//! sibling hashes of each intermediate block.

use std::collections::VecDeque;

use tokio::sync::Mutex;
use tracing::info;

use shared_types::{BlockItem, BlockProof, Hash, MerkleSiblingHash};

use crate::error::{BlockStreamError, Result};
use crate::ports::BlockItemWriter;

/// A closed block awaiting its signature.
pub struct PendingBlock {
    /// Block number.
    pub number: u64,
    /// The block's root hash, the message the signer is asked to sign.
    pub block_hash: Hash,
    /// Proof skeleton: everything but the signature and sibling chain.
    pub proof: BlockProof,
    /// The two sibling hashes a later block's indirect proof needs to climb
    /// through this block: its input tree root and its right parent.
    pub sibling_hashes: [MerkleSiblingHash; 2],
    /// The block's item writer, kept open until the proof is written.
    pub writer: Box<dyn BlockItemWriter>,
}

/// Result of flushing one block's proof.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlushedProof {
    /// Block number the proof was written for.
    pub block: u64,
    /// Whether the proof was indirect (carried sibling hashes).
    pub indirect: bool,
}

/// FIFO queue of pending blocks, strictly increasing block numbers.
#[derive(Default)]
pub struct PendingProofTracker {
    queue: Mutex<VecDeque<PendingBlock>>,
}

impl PendingProofTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a just-closed block.
    pub async fn enqueue(&self, block: PendingBlock) {
        let mut queue = self.queue.lock().await;
        debug_assert!(
            queue.back().map_or(true, |last| last.number < block.number),
            "pending block numbers must be strictly increasing"
        );
        queue.push_back(block);
    }

    /// Number of blocks awaiting proof.
    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Whether no blocks are awaiting proof.
    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }

    /// Routes a ledger signature to the pending blocks it proves.
    ///
    /// The block whose hash equals `message_hash` receives the signature
    /// directly. Every older pending block receives the same signature plus
    /// the concatenated sibling hashes of the blocks between it and the
    /// match. Proofs are written and writers closed in block-number order.
    /// A signature matching no pending block is stale and ignored.
    pub async fn on_signature(
        &self,
        message_hash: Hash,
        signature: &[u8],
    ) -> Result<Vec<FlushedProof>> {
        let proven: Vec<PendingBlock> = {
            let mut queue = self.queue.lock().await;
            let Some(matched) = queue.iter().position(|b| b.block_hash == message_hash) else {
                info!(
                    message_hash = %message_hash,
                    pending = queue.len(),
                    "ignoring signature matching no pending block"
                );
                return Ok(Vec::new());
            };
            queue.drain(..=matched).collect()
        };

        let sibling_sets: Vec<[MerkleSiblingHash; 2]> =
            proven.iter().map(|b| b.sibling_hashes).collect();

        let mut flushed = Vec::with_capacity(proven.len());
        for (idx, mut block) in proven.into_iter().enumerate() {
            let mut proof = block.proof;
            proof.signature = signature.to_vec();
            // The climb from this block's hash to the signed one: the
            // sibling pairs of every later proven block, in block order.
            proof.sibling_hashes = sibling_sets[idx + 1..]
                .iter()
                .flatten()
                .copied()
                .collect();
            let indirect = !proof.sibling_hashes.is_empty();

            let frame = serialize_proof(block.number, proof)?;
            block
                .writer
                .write_items(vec![frame])
                .await
                .map_err(|e| BlockStreamError::WriterFailed {
                    block: block.number,
                    reason: e.to_string(),
                })?;
            block
                .writer
                .close_block()
                .await
                .map_err(|e| BlockStreamError::WriterFailed {
                    block: block.number,
                    reason: e.to_string(),
                })?;
            info!(block = block.number, indirect, "block proof written");
            flushed.push(FlushedProof {
                block: block.number,
                indirect,
            });
        }
        Ok(flushed)
    }
}

fn serialize_proof(block: u64, proof: BlockProof) -> Result<Vec<u8>> {
    bincode::serialize(&BlockItem::BlockProof(proof)).map_err(|e| {
        BlockStreamError::WriterFailed {
            block,
            reason: format!("proof serialization failed: {e}"),
        }
    })
}
