//! Per-level batch combiners.
//!
//! Each tree level owns one [`LevelCombiner`]. Leaves (or combined hashes
//! from the level below) buffer in `pending`; every full batch combines
//! pairwise and the results forward, strictly in batch order, to the next
//! level's combiner. Large batches combine on the rayon pool and deliver
//! through a oneshot channel so the producer never blocks on digest work.

use std::collections::VecDeque;
use std::mem;

use shared_crypto::combine;
use shared_types::Hash;
use tokio::sync::oneshot;

/// A batch whose pairwise combination is either done or in flight on the
/// worker pool.
pub(crate) enum BatchOutput {
    Ready(Vec<Hash>),
    Scheduled(oneshot::Receiver<Vec<Hash>>),
}

pub(crate) struct LevelCombiner {
    /// Height of the nodes this level consumes (leaves are height 0).
    pub(crate) height: usize,
    batch_size: usize,
    offload_threshold: usize,
    /// Nodes waiting for a full batch.
    pub(crate) pending: Vec<Hash>,
    /// Combined batches not yet forwarded, in submission order.
    scheduled: VecDeque<BatchOutput>,
    pub(crate) next: Option<Box<LevelCombiner>>,
}

impl LevelCombiner {
    pub(crate) fn new(height: usize, batch_size: usize, offload_threshold: usize) -> Self {
        Self {
            height,
            batch_size,
            offload_threshold,
            pending: Vec::with_capacity(batch_size),
            scheduled: VecDeque::new(),
            next: None,
        }
    }

    pub(crate) fn add(&mut self, hash: Hash) {
        self.pending.push(hash);
        if self.pending.len() == self.batch_size {
            self.schedule_batch();
            self.forward_ready();
        }
    }

    pub(crate) fn add_all(&mut self, hashes: &[Hash]) {
        for &hash in hashes {
            self.add(hash);
        }
    }

    pub(crate) fn next_level(&mut self) -> &mut LevelCombiner {
        let (height, batch, threshold) = (self.height + 1, self.batch_size, self.offload_threshold);
        self.next
            .get_or_insert_with(|| Box::new(LevelCombiner::new(height, batch, threshold)))
    }

    fn schedule_batch(&mut self) {
        let batch = mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        if batch.len() >= self.offload_threshold {
            let (tx, rx) = oneshot::channel();
            rayon::spawn(move || {
                let _ = tx.send(combine_pairs(&batch));
            });
            self.scheduled.push_back(BatchOutput::Scheduled(rx));
        } else {
            self.scheduled.push_back(BatchOutput::Ready(combine_pairs(&batch)));
        }
    }

    /// Forwards already-completed batches to the next level without
    /// blocking; anything still in flight stays queued in order.
    fn forward_ready(&mut self) {
        while let Some(front) = self.scheduled.front_mut() {
            let combined = match front {
                BatchOutput::Ready(hashes) => mem::take(hashes),
                BatchOutput::Scheduled(rx) => match rx.try_recv() {
                    Ok(hashes) => hashes,
                    Err(_) => break,
                },
            };
            self.scheduled.pop_front();
            self.next_level().add_all(&combined);
        }
    }

    /// Awaits every in-flight batch of this level and forwards the results
    /// in submission order.
    pub(crate) async fn drain_scheduled(&mut self) {
        while let Some(front) = self.scheduled.pop_front() {
            let combined = match front {
                BatchOutput::Ready(hashes) => hashes,
                BatchOutput::Scheduled(rx) => rx
                    .await
                    .expect("hash combination worker dropped its result"),
            };
            self.next_level().add_all(&combined);
        }
    }
}

/// Pairwise combination of an even-length batch.
pub(crate) fn combine_pairs(batch: &[Hash]) -> Vec<Hash> {
    batch
        .chunks_exact(2)
        .map(|pair| combine(&pair[0], &pair[1]))
        .collect()
}

/// Pairwise combination with canonical padding: an odd trailing node pairs
/// with the level's empty-subtree hash.
pub(crate) fn combine_pairs_padded(nodes: &[Hash], null_hash: &Hash) -> Vec<Hash> {
    let mut out = Vec::with_capacity(nodes.len().div_ceil(2));
    let mut chunks = nodes.chunks_exact(2);
    for pair in &mut chunks {
        out.push(combine(&pair[0], &pair[1]));
    }
    if let [last] = chunks.remainder() {
        out.push(combine(last, null_hash));
    }
    out
}
