//! The connection pool manager.
//!
//! Preferred nodes connect unconditionally and are never disturbed.
//! Non-preferred nodes compete for a bounded number of slots, ordered by
//! ascending priority with random tie-breaking, and are periodically torn
//! down and reselected. Every failure, including normal stream completion,
//! schedules exactly one retry with exponential backoff until the node's
//! budget runs out and it is abandoned for the session.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{BlockNodeConfig, ConnectionPoolConfig};
use crate::domain::{select_secondary, ConnectionState};
use crate::error::{BlockNodeError, Result};
use crate::metrics::Metrics;
use crate::ports::{BlockNodeTransport, NodeStream};

struct NodeRuntime {
    config: BlockNodeConfig,
    state: ConnectionState,
    /// Failures since the last successful connection.
    attempts: u32,
    stream: Option<Box<dyn NodeStream>>,
}

enum FailureAction {
    Retry { attempt: u32, delay: Duration },
    Refill,
    Ignore,
}

/// Manages the streams to all configured downstream block nodes.
pub struct ConnectionPoolManager {
    config: ConnectionPoolConfig,
    transport: Arc<dyn BlockNodeTransport>,
    metrics: Arc<Metrics>,
    nodes: AsyncMutex<HashMap<String, NodeRuntime>>,
}

impl ConnectionPoolManager {
    /// Creates a pool over the given nodes. Endpoints must be unique.
    pub fn new(
        config: ConnectionPoolConfig,
        node_configs: Vec<BlockNodeConfig>,
        transport: Arc<dyn BlockNodeTransport>,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        let mut nodes = HashMap::with_capacity(node_configs.len());
        for node in node_configs {
            let endpoint = node.endpoint.clone();
            let previous = nodes.insert(
                endpoint.clone(),
                NodeRuntime {
                    config: node,
                    state: ConnectionState::Disconnected,
                    attempts: 0,
                    stream: None,
                },
            );
            if previous.is_some() {
                return Err(BlockNodeError::InvalidConfig {
                    reason: format!("duplicate block node endpoint {endpoint}"),
                });
            }
        }
        Ok(Arc::new(Self {
            config,
            transport,
            metrics: Arc::new(Metrics::new()),
            nodes: AsyncMutex::new(nodes),
        }))
    }

    /// Metrics handle.
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Connects every preferred node plus enough non-preferred candidates
    /// to fill the secondary slots.
    pub async fn establish_connections(self: &Arc<Self>) {
        let to_connect = {
            let mut nodes = self.nodes.lock().await;
            let mut chosen: Vec<String> = nodes
                .values()
                .filter(|n| n.config.preferred && n.state == ConnectionState::Disconnected)
                .map(|n| n.config.endpoint.clone())
                .collect();

            let occupied = nodes
                .values()
                .filter(|n| !n.config.preferred && n.state.occupies_slot())
                .count();
            let slots = self.config.max_secondary_connections.saturating_sub(occupied);
            let candidates: Vec<(String, i32)> = nodes
                .values()
                .filter(|n| !n.config.preferred && n.state == ConnectionState::Disconnected)
                .map(|n| (n.config.endpoint.clone(), n.config.priority))
                .collect();
            chosen.extend(select_secondary(&candidates, slots, &mut rand::thread_rng()));

            for endpoint in &chosen {
                if let Some(node) = nodes.get_mut(endpoint) {
                    node.state = ConnectionState::Connecting;
                }
            }
            chosen
        };

        for endpoint in to_connect {
            let pool = Arc::clone(self);
            tokio::spawn(async move {
                pool.connect_node(endpoint).await;
            });
        }
    }

    // Boxed: the retry path re-enters connect_node through
    // handle_connection_error, and a recursive async fn has no nameable
    // future type.
    fn connect_node(
        self: Arc<Self>,
        endpoint: String,
    ) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            match self.transport.connect(&endpoint).await {
                Ok(stream) => {
                    let mut nodes = self.nodes.lock().await;
                    if let Some(node) = nodes.get_mut(&endpoint) {
                        if node.state != ConnectionState::Connecting {
                            // Reselected or abandoned while the attempt was
                            // in flight.
                            return;
                        }
                        node.state = ConnectionState::Connected;
                        node.attempts = 0;
                        node.stream = Some(stream);
                        self.metrics.record_connected();
                        info!(endpoint = %endpoint, "connected to block node");
                    }
                }
                Err(e) => {
                    debug!(endpoint = %endpoint, error = %e, "connection attempt failed");
                    self.handle_connection_error(&endpoint).await;
                }
            }
        })
    }

    /// Handles a transport failure or a completed stream for one node.
    ///
    /// Stream completion is not a clean shutdown; the stream has no
    /// intentional end, so it takes the same path as any other failure.
    pub async fn handle_connection_error(self: &Arc<Self>, endpoint: &str) {
        self.metrics.record_connection_failure();
        let action = {
            let mut nodes = self.nodes.lock().await;
            match nodes.get_mut(endpoint) {
                Some(node) if node.state != ConnectionState::Abandoned => {
                    node.stream = None;
                    node.attempts += 1;
                    if node.attempts > self.config.max_retry_attempts {
                        node.state = ConnectionState::Abandoned;
                        self.metrics.record_abandoned();
                        warn!(
                            endpoint = %endpoint,
                            attempts = node.attempts - 1,
                            "retry budget exhausted, dropping block node for this session"
                        );
                        FailureAction::Refill
                    } else {
                        let attempt = node.attempts;
                        node.state = ConnectionState::Backoff { attempt };
                        FailureAction::Retry {
                            attempt,
                            delay: self.config.retry_delay(attempt),
                        }
                    }
                }
                _ => FailureAction::Ignore,
            }
        };

        match action {
            FailureAction::Retry { attempt, delay } => {
                if attempt == 1 {
                    debug!(endpoint = %endpoint, ?delay, "scheduling first retry");
                } else if attempt * 2 >= self.config.max_retry_attempts {
                    warn!(
                        endpoint = %endpoint,
                        attempt,
                        budget = self.config.max_retry_attempts,
                        ?delay,
                        "block node keeps failing"
                    );
                } else {
                    info!(endpoint = %endpoint, attempt, ?delay, "scheduling retry");
                }
                let pool = Arc::clone(self);
                let endpoint = endpoint.to_string();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    {
                        let mut nodes = pool.nodes.lock().await;
                        match nodes.get_mut(&endpoint) {
                            Some(node)
                                if matches!(node.state, ConnectionState::Backoff { .. }) =>
                            {
                                node.state = ConnectionState::Connecting;
                            }
                            // Reselected or abandoned during the backoff.
                            _ => return,
                        }
                    }
                    pool.connect_node(endpoint).await;
                });
            }
            // The freed slot goes to the next-best candidate right away.
            FailureAction::Refill => self.establish_connections().await,
            FailureAction::Ignore => {}
        }
    }

    /// Reports that a node's stream completed.
    pub async fn handle_stream_closed(self: &Arc<Self>, endpoint: &str) -> Result<()> {
        if !self.nodes.lock().await.contains_key(endpoint) {
            return Err(BlockNodeError::UnknownEndpoint {
                endpoint: endpoint.to_string(),
            });
        }
        info!(endpoint = %endpoint, "stream completed, treating as connection error");
        self.handle_connection_error(endpoint).await;
        Ok(())
    }

    /// Sends one batch to every connected node. Per-stream failures route
    /// into the retry path and are invisible to the caller.
    pub async fn broadcast(self: &Arc<Self>, bytes: &[u8]) {
        let mut failed = Vec::new();
        {
            let mut nodes = self.nodes.lock().await;
            for (endpoint, node) in nodes.iter_mut() {
                if node.state != ConnectionState::Connected {
                    continue;
                }
                let Some(stream) = node.stream.as_mut() else {
                    continue;
                };
                if let Err(e) = stream.send(bytes.to_vec()).await {
                    warn!(endpoint = %endpoint, error = %e, "send to block node failed");
                    failed.push(endpoint.clone());
                }
            }
        }
        self.metrics.record_broadcast(failed.len() as u64);
        for endpoint in failed {
            self.handle_connection_error(&endpoint).await;
        }
    }

    /// Tears down all non-preferred connections and reselects candidates.
    /// Preferred connections are untouched.
    pub async fn reselect(self: &Arc<Self>) {
        self.metrics.record_reselection();
        {
            let mut nodes = self.nodes.lock().await;
            for node in nodes.values_mut() {
                if !node.config.preferred && node.state != ConnectionState::Abandoned {
                    node.stream = None;
                    node.state = ConnectionState::Disconnected;
                    node.attempts = 0;
                }
            }
        }
        info!("reselecting block node connections");
        self.establish_connections().await;
    }

    /// Spawns the periodic reselection task.
    pub fn start_reselection(self: &Arc<Self>) -> JoinHandle<()> {
        let pool = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(pool.config.reselection_interval());
            // The first tick fires immediately; connections already exist.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                pool.reselect().await;
            }
        })
    }

    /// Current state of one node.
    pub async fn state_of(&self, endpoint: &str) -> Option<ConnectionState> {
        self.nodes.lock().await.get(endpoint).map(|n| n.state)
    }

    /// Endpoints currently connected, in no particular order.
    pub async fn connected_endpoints(&self) -> Vec<String> {
        self.nodes
            .lock()
            .await
            .values()
            .filter(|n| n.state == ConnectionState::Connected)
            .map(|n| n.config.endpoint.clone())
            .collect()
    }
}
