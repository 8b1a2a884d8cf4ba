//! Metrics collection for the block stream subsystem.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for block assembly and proof flushing.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Total blocks closed.
    pub blocks_closed: AtomicU64,

    /// Total block items written.
    pub items_written: AtomicU64,

    /// Total serialization batches scheduled.
    pub batches_scheduled: AtomicU64,

    /// Blocks finalized with a direct proof.
    pub direct_proofs: AtomicU64,

    /// Blocks finalized with an indirect proof.
    pub indirect_proofs: AtomicU64,

    /// Signatures that matched no pending block.
    pub stale_signatures: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a closed block.
    pub fn record_block_closed(&self, item_count: u64) {
        self.blocks_closed.fetch_add(1, Ordering::Relaxed);
        self.items_written.fetch_add(item_count, Ordering::Relaxed);
    }

    /// Record a scheduled serialization batch.
    pub fn record_batch_scheduled(&self) {
        self.batches_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a flushed proof.
    pub fn record_proof_flushed(&self, indirect: bool) {
        if indirect {
            self.indirect_proofs.fetch_add(1, Ordering::Relaxed);
        } else {
            self.direct_proofs.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a signature that matched no pending block.
    pub fn record_stale_signature(&self) {
        self.stale_signatures.fetch_add(1, Ordering::Relaxed);
    }

    /// Average items per closed block.
    pub fn avg_items_per_block(&self) -> f64 {
        let blocks = self.blocks_closed.load(Ordering::Relaxed);
        if blocks == 0 {
            return 0.0;
        }
        self.items_written.load(Ordering::Relaxed) as f64 / blocks as f64
    }
}
