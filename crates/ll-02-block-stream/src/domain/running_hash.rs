//! Rolling window of per-transaction result running hashes.
//!
//! Four slots: the current running hash plus the three before it. The
//! oldest slot doubles as the pseudo-randomness seed; callers must flush
//! the ordering pipeline before reading it so two consecutive transactions
//! never observe the same window.

use shared_crypto::combine;
use shared_types::{Hash, ZERO_HASH};

/// The four rolling running-hash slots (N, N-1, N-2, N-3).
#[derive(Debug, Default)]
pub struct RunningHashManager {
    n_minus_3: Option<Hash>,
    n_minus_2: Option<Hash>,
    n_minus_1: Option<Hash>,
    current: Hash,
}

impl RunningHashManager {
    /// Creates an empty manager. Call [`start_block`](Self::start_block)
    /// before feeding results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the window from the persisted trailing result hashes, oldest
    /// first. Fewer than four near genesis; missing older slots stay
    /// `None` and a missing current slot defaults to the zero hash.
    pub fn start_block(&mut self, trailing: &[Hash]) {
        let mut iter = trailing.iter().rev().copied();
        self.current = iter.next().unwrap_or(ZERO_HASH);
        self.n_minus_1 = iter.next();
        self.n_minus_2 = iter.next();
        self.n_minus_3 = iter.next();
    }

    /// Chains one transaction result hash into the window:
    /// `new = SHA384(current || result_hash)`.
    pub fn next_result_hash(&mut self, result_hash: Hash) {
        self.n_minus_3 = self.n_minus_2.take();
        self.n_minus_2 = self.n_minus_1.take();
        self.n_minus_1 = Some(self.current);
        self.current = combine(&self.current, &result_hash);
    }

    /// Current running hash.
    pub fn latest(&self) -> Hash {
        self.current
    }

    /// The populated slots, oldest first, for persistence.
    pub fn latest_hashes(&self) -> Vec<Hash> {
        [self.n_minus_3, self.n_minus_2, self.n_minus_1]
            .into_iter()
            .flatten()
            .chain(std::iter::once(self.current))
            .collect()
    }

    /// The N-3 slot, used as a pseudo-randomness seed. `None` until the
    /// window reaches depth four; starting from genesis the zero hash
    /// counts, so the third chained result fills it.
    pub fn seed(&self) -> Option<Hash> {
        self.n_minus_3
    }
}
