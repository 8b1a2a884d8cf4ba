//! The block lifecycle state machine.
//!
//! One block is `Idle -> Open -> Closing -> Idle`, nested inside
//! `start_round` / `end_round` cycles driven by the consensus layer; one or
//! more rounds compose a block. Items stream in through [`write_item`] and
//! flow through a two-stage pipeline: a parallel stage (serialize and hash
//! on the worker pool) and a sequential stage chained one batch after
//! another, so frames reach the writer in exact submission order no matter
//! how the parallel work completes.
//!
//! [`write_item`]: BlockStreamService::write_item

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex as ControlMutex;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn};

use ll_01_tree_hasher::{ConcurrentTreeHasher, TreeHasherConfig};
use shared_crypto::combine;
use shared_types::{
    BlockHeader, BlockItem, BlockProof, ChainSnapshot, Hash, HashAlgorithm, MerkleSiblingHash,
    RoundInfo, SemanticVersion, Timestamp,
};

use crate::config::BlockStreamConfig;
use crate::domain::pending_proofs::FlushedProof;
use crate::domain::{
    should_close_block, BlockHashManager, BoundaryContext, PendingBlock, PendingProofTracker,
    RunningHashManager,
};
use crate::error::{BlockStreamError, Result};
use crate::metrics::Metrics;
use crate::pipeline::compute_batch;
use crate::ports::{BlockItemWriter, BlockItemWriterFactory, BlockSigner, ChainStateStore};

/// The start-of-block state hash for the first block after startup.
///
/// The first block's start-of-block state hash is the end-of-round hash of
/// the last round handled before the restart; it is either already known
/// (loaded with the state) or still being computed.
pub struct InitialStateHash {
    round: u64,
    rx: oneshot::Receiver<Hash>,
    tx: Option<oneshot::Sender<Hash>>,
}

impl InitialStateHash {
    /// The hash is already known.
    pub fn ready(round: u64, hash: Hash) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(hash);
        Self {
            round,
            rx,
            tx: None,
        }
    }

    /// The hash will arrive later through
    /// [`BlockStreamService::notify_state_hashed`] for the given round.
    pub fn pending(round: u64) -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            round,
            rx,
            tx: Some(tx),
        }
    }
}

/// Everything mutated by the sequential pipeline stage. Lives behind an
/// async mutex because tree finalization and writes await inside it.
struct OpenBlock {
    input_tree: ConcurrentTreeHasher,
    output_tree: ConcurrentTreeHasher,
    running_hashes: RunningHashManager,
    writer: Option<Box<dyn BlockItemWriter>>,
    /// First failure of the sequential stage. Poisons the block; surfaced
    /// as fatal at close.
    failed: Option<String>,
}

impl OpenBlock {
    async fn apply_batch(&mut self, work: crate::pipeline::BatchWork) {
        if self.failed.is_some() {
            return;
        }
        for leaf in work.input_leaves {
            if let Err(e) = self.input_tree.add_leaf(leaf) {
                self.failed = Some(e.to_string());
                return;
            }
        }
        for leaf in work.output_leaves {
            if let Err(e) = self.output_tree.add_leaf(leaf) {
                self.failed = Some(e.to_string());
                return;
            }
        }
        for hash in work.result_hashes {
            self.running_hashes.next_result_hash(hash);
        }
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.write_items(work.frames).await {
                self.failed = Some(e.to_string());
            }
        }
    }
}

/// Control-plane state. Guarded by a plain mutex and never held across an
/// await point.
struct ControlState {
    last_block_hash: Option<Hash>,
    /// Number of the most recently opened block.
    block_number: u64,
    block_open: bool,
    /// Consensus timestamp of the open block's first round.
    block_timestamp: Timestamp,
    freeze_pending: bool,
    last_round_number: u64,
    items_in_block: u64,
    /// Items not yet handed to the pipeline.
    pending_items: Vec<BlockItem>,
    /// The block header, held back until the first event transaction
    /// supplies its timestamp.
    deferred_header: Option<BlockHeader>,
    /// Completion of the most recently scheduled sequential stage.
    chain_tail: Option<oneshot::Receiver<()>>,
    state_hash_txs: HashMap<u64, oneshot::Sender<Hash>>,
    state_hash_rxs: HashMap<u64, oneshot::Receiver<Hash>>,
    /// Receiver for the open (or next) block's start-of-block state hash,
    /// tagged with the round it belongs to.
    start_state: Option<(u64, oneshot::Receiver<Hash>)>,
    snapshot: ChainSnapshot,
    block_hashes: BlockHashManager,
    open: Option<Arc<AsyncMutex<OpenBlock>>>,
}

/// The block stream production service.
pub struct BlockStreamService {
    config: BlockStreamConfig,
    software_version: SemanticVersion,
    writer_factory: Arc<dyn BlockItemWriterFactory>,
    signer: Arc<dyn BlockSigner>,
    state_store: Arc<dyn ChainStateStore>,
    pending_proofs: Arc<PendingProofTracker>,
    metrics: Arc<Metrics>,
    control: ControlMutex<ControlState>,
}

impl BlockStreamService {
    /// Creates the service from its configuration, outbound ports, the
    /// chain snapshot loaded at startup, and the initial state hash.
    pub fn new(
        config: BlockStreamConfig,
        software_version: SemanticVersion,
        writer_factory: Arc<dyn BlockItemWriterFactory>,
        signer: Arc<dyn BlockSigner>,
        state_store: Arc<dyn ChainStateStore>,
        snapshot: ChainSnapshot,
        initial_state_hash: InitialStateHash,
    ) -> Result<Self> {
        config.validate()?;
        let mut state_hash_txs = HashMap::new();
        if let Some(tx) = initial_state_hash.tx {
            state_hash_txs.insert(initial_state_hash.round, tx);
        }
        let control = ControlState {
            last_block_hash: None,
            block_number: snapshot.block_number,
            block_open: false,
            block_timestamp: snapshot.block_timestamp,
            freeze_pending: false,
            last_round_number: initial_state_hash.round,
            items_in_block: 0,
            pending_items: Vec::new(),
            deferred_header: None,
            chain_tail: None,
            state_hash_txs,
            state_hash_rxs: HashMap::new(),
            start_state: Some((initial_state_hash.round, initial_state_hash.rx)),
            block_hashes: BlockHashManager::new(config.trailing_block_count),
            snapshot,
            open: None,
        };
        Ok(Self {
            config,
            software_version,
            writer_factory,
            signer,
            state_store,
            pending_proofs: Arc::new(PendingProofTracker::new()),
            metrics: Arc::new(Metrics::new()),
            control: ControlMutex::new(control),
        })
    }

    /// Metrics handle.
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Sets the hash of the last block produced before startup. Must be
    /// called before the first round.
    pub fn init_last_block_hash(&self, hash: Hash) {
        self.control.lock().last_block_hash = Some(hash);
    }

    /// Number of the most recently opened block.
    pub fn block_number(&self) -> u64 {
        self.control.lock().block_number
    }

    /// Consensus timestamp of the open block's first round.
    pub fn block_timestamp(&self) -> Timestamp {
        self.control.lock().block_timestamp
    }

    /// Hash of a finalized block inside the trailing window.
    pub fn block_hash_by_number(&self, n: u64) -> Option<Hash> {
        self.control.lock().block_hashes.hash_of_block(n)
    }

    /// Begins a round, opening a new block if none is open.
    pub async fn start_round(&self, round: &RoundInfo) -> Result<()> {
        let must_open = {
            let mut control = self.control.lock();
            if control.last_block_hash.is_none() {
                return Err(BlockStreamError::NotInitialized);
            }
            let (tx, rx) = oneshot::channel();
            control.state_hash_txs.insert(round.number, tx);
            control.state_hash_rxs.insert(round.number, rx);
            control.last_round_number = round.number;
            if round.is_freeze_round {
                control.freeze_pending = true;
            }
            !control.block_open
        };
        if must_open {
            self.open_block(round).await?;
        }
        Ok(())
    }

    async fn open_block(&self, round: &RoundInfo) -> Result<()> {
        let number = self.control.lock().block_number + 1;
        let writer = self
            .writer_factory
            .open_block(number)
            .await
            .map_err(|e| BlockStreamError::WriterOpenFailed {
                block: number,
                reason: e.to_string(),
            })?;
        let signer_ready = self.signer.is_ready().await;

        let mut control = self.control.lock();
        let previous = control
            .last_block_hash
            .ok_or(BlockStreamError::NotInitialized)?;
        control.block_number = number;
        control.block_open = true;
        control.block_timestamp = round.consensus_timestamp;
        control.items_in_block = 0;

        let trailing = control.snapshot.trailing_block_hashes.clone();
        control.block_hashes.start_block(&trailing, previous, number);

        let mut running_hashes = RunningHashManager::new();
        running_hashes.start_block(&control.snapshot.trailing_result_hashes);

        let tree_config = TreeHasherConfig {
            combine_batch_size: self.config.hash_combine_batch_size,
            offload_threshold: self.config.combine_offload_threshold,
        };
        control.open = Some(Arc::new(AsyncMutex::new(OpenBlock {
            input_tree: ConcurrentTreeHasher::new(tree_config)?,
            output_tree: ConcurrentTreeHasher::new(tree_config)?,
            running_hashes,
            writer: Some(writer),
            failed: None,
        })));

        let header = BlockHeader {
            number,
            previous_block_hash: previous,
            hash_algorithm: HashAlgorithm::Sha2_384,
            software_version: self.software_version,
            first_transaction_time: None,
        };
        if signer_ready {
            // Held back so the first event transaction can stamp it.
            control.deferred_header = Some(header);
        } else {
            // No user transactions will arrive while the signer is down,
            // so there is nothing to wait for.
            control.pending_items.push(BlockItem::Header(header));
            control.items_in_block += 1;
        }
        info!(block = number, round = round.number, "opened block");
        Ok(())
    }

    /// Appends one item to the open block.
    pub fn write_item(&self, item: BlockItem) -> Result<()> {
        let mut control = self.control.lock();
        if !control.block_open {
            return Err(BlockStreamError::NoOpenBlock {
                round: control.last_round_number,
            });
        }
        if let BlockItem::EventTransaction(tx) = &item {
            if let Some(mut header) = control.deferred_header.take() {
                header.first_transaction_time = Some(tx.consensus_timestamp);
                control.pending_items.insert(0, BlockItem::Header(header));
                control.items_in_block += 1;
            }
        }
        control.pending_items.push(item);
        control.items_in_block += 1;
        // No auto-flush while the header is deferred; a forced sync emits
        // the header itself.
        if control.deferred_header.is_none()
            && control.pending_items.len() >= self.config.serialization_batch_size
        {
            let batch = std::mem::take(&mut control.pending_items);
            self.schedule_batch(&mut control, batch);
        }
        Ok(())
    }

    /// Hands a batch to the parallel stage and chains its sequential stage
    /// after the previous one.
    fn schedule_batch(&self, control: &mut ControlState, items: Vec<BlockItem>) {
        let Some(open) = control.open.clone() else {
            return;
        };
        let (work_tx, work_rx) = oneshot::channel();
        rayon::spawn(move || {
            let _ = work_tx.send(compute_batch(&items));
        });

        let prev_tail = control.chain_tail.take();
        let (done_tx, done_rx) = oneshot::channel();
        control.chain_tail = Some(done_rx);
        self.metrics.record_batch_scheduled();

        tokio::spawn(async move {
            if let Some(prev) = prev_tail {
                let _ = prev.await;
            }
            let mut block = open.lock().await;
            match work_rx.await {
                Ok(Ok(work)) => block.apply_batch(work).await,
                Ok(Err(reason)) => {
                    if block.failed.is_none() {
                        block.failed = Some(reason);
                    }
                }
                Err(_) => {
                    if block.failed.is_none() {
                        block.failed = Some("parallel stage dropped its result".into());
                    }
                }
            }
            let _ = done_tx.send(());
        });
    }

    /// Flushes buffered items and waits for every in-flight batch.
    ///
    /// A header still deferred at this point flushes first, stamped from
    /// the first buffered event transaction if one exists; the header must
    /// be the first frame of the block even on a forced flush.
    pub async fn sync(&self) -> Result<()> {
        let tail = {
            let mut control = self.control.lock();
            if !control.pending_items.is_empty() {
                if let Some(mut header) = control.deferred_header.take() {
                    header.first_transaction_time =
                        control.pending_items.iter().find_map(|item| match item {
                            BlockItem::EventTransaction(tx) => Some(tx.consensus_timestamp),
                            _ => None,
                        });
                    control.pending_items.insert(0, BlockItem::Header(header));
                    control.items_in_block += 1;
                }
                let batch = std::mem::take(&mut control.pending_items);
                self.schedule_batch(&mut control, batch);
            }
            control.chain_tail.take()
        };
        if let Some(tail) = tail {
            let _ = tail.await;
        }
        Ok(())
    }

    /// The pseudo-randomness seed: the oldest trailing running hash.
    ///
    /// Syncs the pipeline first so consecutive reads around a transaction
    /// never observe the same window. `None` until enough results have
    /// been chained since genesis to fill the oldest slot.
    pub async fn prng_seed(&self) -> Result<Option<Hash>> {
        self.sync().await?;
        let open = self.control.lock().open.clone();
        match open {
            Some(open) => Ok(open.lock().await.running_hashes.seed()),
            None => Ok(None),
        }
    }

    /// Ends a round, closing the block when the boundary policy says so.
    /// Returns whether a block closed.
    pub async fn end_round(&self, round: &RoundInfo) -> Result<bool> {
        let signer_ready = self.signer.is_ready().await;
        let close = {
            let control = self.control.lock();
            if !control.block_open {
                return Err(BlockStreamError::NoOpenBlock {
                    round: round.number,
                });
            }
            let ctx = BoundaryContext {
                round_number: round.number,
                round_timestamp: round.consensus_timestamp,
                block_first_round_timestamp: control.block_timestamp,
                freeze_pending: control.freeze_pending,
                signer_ready,
            };
            should_close_block(&ctx, self.config.block_period, self.config.rounds_per_block)
        };
        if !close {
            return Ok(false);
        }
        self.close_block(round).await?;
        Ok(true)
    }

    async fn close_block(&self, round: &RoundInfo) -> Result<()> {
        // A header still deferred means the block saw no transactions; it
        // flushes now without a first-transaction time.
        {
            let mut control = self.control.lock();
            if let Some(header) = control.deferred_header.take() {
                control.pending_items.insert(0, BlockItem::Header(header));
                control.items_in_block += 1;
            }
        }
        self.sync().await?;

        let (open, number, previous, start_state) = {
            let mut control = self.control.lock();
            let open = control
                .open
                .take()
                .ok_or(BlockStreamError::NoOpenBlock {
                    round: round.number,
                })?;
            let previous = control
                .last_block_hash
                .ok_or(BlockStreamError::NotInitialized)?;
            let start_state = control.start_state.take();
            (open, control.block_number, previous, start_state)
        };

        let mut block = open.lock().await;
        if let Some(reason) = block.failed.take() {
            return Err(BlockStreamError::WriterFailed {
                block: number,
                reason,
            });
        }

        let input_root = block.input_tree.root_hash().await;
        let (state_round, state_rx) = start_state.ok_or(
            BlockStreamError::StateHashUnavailable {
                round: round.number,
            },
        )?;
        let start_state_hash =
            state_rx
                .await
                .map_err(|_| BlockStreamError::StateHashUnavailable {
                    round: state_round,
                })?;
        let output_status = block.output_tree.status().await;
        let output_root = block.output_tree.root_hash().await;

        let left_parent = combine(&previous, &input_root);
        let right_parent = combine(&output_root, &start_state_hash);
        let block_hash = combine(&left_parent, &right_parent);

        let snapshot = {
            let control = self.control.lock();
            ChainSnapshot {
                block_number: number,
                block_timestamp: control.block_timestamp,
                trailing_block_hashes: control.block_hashes.block_hashes().to_vec(),
                trailing_result_hashes: block.running_hashes.latest_hashes(),
                input_tree_root: input_root,
                start_of_block_state_hash: start_state_hash,
                output_tree_status: output_status,
                software_version: self.software_version,
            }
        };
        self.state_store.commit(&snapshot).await.map_err(|e| {
            BlockStreamError::StateCommitFailed {
                block: number,
                reason: e.to_string(),
            }
        })?;

        let writer = block.writer.take();
        drop(block);

        let sibling_hashes = [
            MerkleSiblingHash {
                is_first: false,
                hash: input_root,
            },
            MerkleSiblingHash {
                is_first: false,
                hash: right_parent,
            },
        ];
        if let Some(writer) = writer {
            self.pending_proofs
                .enqueue(PendingBlock {
                    number,
                    block_hash,
                    proof: BlockProof {
                        block: number,
                        previous_block_root_hash: previous,
                        start_of_block_state_root_hash: start_state_hash,
                        signature: Vec::new(),
                        sibling_hashes: Vec::new(),
                    },
                    sibling_hashes,
                    writer,
                })
                .await;
        }

        let items = {
            let mut control = self.control.lock();
            control.last_block_hash = Some(block_hash);
            control.block_open = false;
            control.freeze_pending = false;
            control.snapshot = snapshot;
            // This round's end-of-round hash is the next block's
            // start-of-block state hash.
            control.start_state = control
                .state_hash_rxs
                .remove(&round.number)
                .map(|rx| (round.number, rx));
            let stale_before = round.number;
            control.state_hash_txs.retain(|r, _| *r >= stale_before);
            control.state_hash_rxs.retain(|r, _| *r >= stale_before);
            control.items_in_block
        };
        self.metrics.record_block_closed(items);
        info!(
            block = number,
            round = round.number,
            hash = %block_hash,
            "closed block"
        );

        self.spawn_signing(block_hash, number);
        Ok(())
    }

    /// Asks the signer for this block's signature and routes the result
    /// back into proof tracking.
    fn spawn_signing(&self, block_hash: Hash, number: u64) {
        let signer = Arc::clone(&self.signer);
        let tracker = Arc::clone(&self.pending_proofs);
        let metrics = Arc::clone(&self.metrics);
        tokio::spawn(async move {
            match signer.sign(block_hash).await {
                Ok(signature) => {
                    match tracker.on_signature(block_hash, &signature).await {
                        Ok(flushed) => record_flushed(&metrics, &flushed),
                        Err(e) => error!(block = number, error = %e, "proof flush failed"),
                    }
                }
                // The block stays pending; a later block's signature will
                // prove it indirectly.
                Err(e) => {
                    let err = BlockStreamError::SigningFailed {
                        block: number,
                        reason: e.to_string(),
                    };
                    warn!(block = number, error = %err, "leaving block for an indirect proof");
                }
            }
        });
    }

    /// Routes an externally delivered ledger signature.
    pub async fn handle_signature(&self, message_hash: Hash, signature: &[u8]) -> Result<()> {
        let flushed = self.pending_proofs.on_signature(message_hash, signature).await?;
        if flushed.is_empty() {
            self.metrics.record_stale_signature();
        } else {
            record_flushed(&self.metrics, &flushed);
        }
        Ok(())
    }

    /// Delivers the end-of-round state hash for a round.
    pub fn notify_state_hashed(&self, round_number: u64, state_hash: Hash) {
        let tx = self.control.lock().state_hash_txs.remove(&round_number);
        match tx {
            Some(tx) => {
                let _ = tx.send(state_hash);
            }
            None => debug!(round = round_number, "state hash for unknown round"),
        }
    }
}

fn record_flushed(metrics: &Metrics, flushed: &[FlushedProof]) {
    for proof in flushed {
        metrics.record_proof_flushed(proof.indirect);
    }
}
