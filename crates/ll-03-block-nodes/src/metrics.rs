//! Metrics collection for the block node connection pool.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for pool activity.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Successful connections established.
    pub connections_established: AtomicU64,

    /// Connection attempts that failed (including closed streams).
    pub connection_failures: AtomicU64,

    /// Nodes abandoned after exhausting their retry budget.
    pub nodes_abandoned: AtomicU64,

    /// Reselection sweeps performed.
    pub reselections: AtomicU64,

    /// Broadcasts fanned out.
    pub broadcasts: AtomicU64,

    /// Per-stream send failures during broadcasts.
    pub send_failures: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an established connection.
    pub fn record_connected(&self) {
        self.connections_established.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed connection attempt or closed stream.
    pub fn record_connection_failure(&self) {
        self.connection_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an abandoned node.
    pub fn record_abandoned(&self) {
        self.nodes_abandoned.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a reselection sweep.
    pub fn record_reselection(&self) {
        self.reselections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a broadcast and how many of its sends failed.
    pub fn record_broadcast(&self, failures: u64) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.send_failures.fetch_add(failures, Ordering::Relaxed);
    }
}
