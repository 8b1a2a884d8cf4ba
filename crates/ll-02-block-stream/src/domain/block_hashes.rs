//! Bounded trailing history of finalized block hashes.

use shared_types::Hash;

/// Retains the hashes of the most recent finalized blocks for lookup by
/// block number.
#[derive(Debug)]
pub struct BlockHashManager {
    capacity: usize,
    hashes: Vec<Hash>,
    /// Number of the block currently being assembled.
    current_block: u64,
}

impl BlockHashManager {
    /// Creates a manager retaining at most `capacity` hashes.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            hashes: Vec::new(),
            current_block: 0,
        }
    }

    /// Begins a block: restores the persisted trailing hashes, appends the
    /// previous block's hash, and evicts the oldest past capacity.
    pub fn start_block(
        &mut self,
        trailing: &[Hash],
        previous_block_hash: Hash,
        current_block: u64,
    ) {
        self.current_block = current_block;
        self.hashes.clear();
        self.hashes.extend_from_slice(trailing);
        self.hashes.push(previous_block_hash);
        if self.hashes.len() > self.capacity {
            let excess = self.hashes.len() - self.capacity;
            self.hashes.drain(..excess);
        }
    }

    /// Hash of block `n`. `None` for the in-flight block, unstarted
    /// blocks, and blocks older than the retained window.
    pub fn hash_of_block(&self, n: u64) -> Option<Hash> {
        if n >= self.current_block {
            return None;
        }
        let back = (self.current_block - n) as usize;
        if back > self.hashes.len() {
            return None;
        }
        Some(self.hashes[self.hashes.len() - back])
    }

    /// The retained hashes, oldest first, for persistence.
    pub fn block_hashes(&self) -> &[Hash] {
        &self.hashes
    }
}
