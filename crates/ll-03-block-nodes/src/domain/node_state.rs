//! Per-node connection lifecycle.

/// Lifecycle state of one block node connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and none in progress.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Connected and streaming.
    Connected,
    /// Waiting out a retry delay after a failure.
    Backoff {
        /// Which retry this backoff precedes, 1-based.
        attempt: u32,
    },
    /// Retry budget exhausted; ignored until the node restarts.
    Abandoned,
}

impl ConnectionState {
    /// Whether the node counts against the secondary connection budget.
    /// A node waiting out a backoff keeps its slot; only a disconnected or
    /// abandoned node frees one.
    pub fn occupies_slot(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::Connected | Self::Backoff { .. }
        )
    }
}
