//! The parallel stage of the item ordering pipeline.
//!
//! Each serialization batch is handed to the worker pool, which serializes
//! every item, hashes the Merkle-relevant ones, and buckets the hashes by
//! destination. The sequential stage (in the service) then feeds trees and
//! running hashes and writes the frames, strictly in submission order.

use rayon::prelude::*;

use shared_crypto::sha384;
use shared_types::{BlockItem, Hash};

/// Everything the sequential stage needs from one batch, with item order
/// preserved inside every bucket.
#[derive(Debug, Default)]
pub(crate) struct BatchWork {
    /// Serialized item frames, one per item, in item order.
    pub frames: Vec<Vec<u8>>,
    /// Leaf hashes for the input tree, in item order.
    pub input_leaves: Vec<Hash>,
    /// Leaf hashes for the output tree, in item order.
    pub output_leaves: Vec<Hash>,
    /// Hashes of transaction results, in item order, for the running hash.
    pub result_hashes: Vec<Hash>,
}

/// Serializes and hashes one batch on the calling (rayon) thread pool.
///
/// Serialization of a closed item union cannot fail in practice, but the
/// error is carried rather than unwrapped so a future payload type cannot
/// panic the pipeline.
pub(crate) fn compute_batch(items: &[BlockItem]) -> Result<BatchWork, String> {
    let per_item: Vec<(Vec<u8>, Option<Hash>)> = items
        .par_iter()
        .map(|item| {
            let frame = bincode::serialize(item).map_err(|e| e.to_string())?;
            let leaf = (item.is_input() || item.is_output()).then(|| sha384(&frame));
            Ok((frame, leaf))
        })
        .collect::<Result<_, String>>()?;

    let mut work = BatchWork::default();
    for (item, (frame, leaf)) in items.iter().zip(per_item) {
        if let Some(leaf) = leaf {
            if item.is_input() {
                work.input_leaves.push(leaf);
            } else {
                work.output_leaves.push(leaf);
            }
            if item.is_transaction_result() {
                work.result_hashes.push(leaf);
            }
        }
        work.frames.push(frame);
    }
    Ok(work)
}
