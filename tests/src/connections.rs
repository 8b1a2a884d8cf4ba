//! Block node pool flows: broadcast fan-out and recovery after a stream
//! ends.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use ll_03_block_nodes::ports::{BlockNodeTransport, NodeStream, TransportError};
    use ll_03_block_nodes::{
        BlockNodeConfig, ConnectionPoolConfig, ConnectionPoolManager, ConnectionState,
    };

    #[derive(Default)]
    struct RecordingTransport {
        sent: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
        refused: Mutex<HashSet<String>>,
    }

    struct RecordingStream {
        endpoint: String,
        sent: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    }

    #[async_trait]
    impl NodeStream for RecordingStream {
        async fn send(&mut self, bytes: Vec<u8>) -> Result<(), TransportError> {
            self.sent.lock().push((self.endpoint.clone(), bytes));
            Ok(())
        }
    }

    #[async_trait]
    impl BlockNodeTransport for RecordingTransport {
        async fn connect(&self, endpoint: &str) -> Result<Box<dyn NodeStream>, TransportError> {
            if self.refused.lock().contains(endpoint) {
                return Err(TransportError::new("refused"));
            }
            Ok(Box::new(RecordingStream {
                endpoint: endpoint.to_string(),
                sent: Arc::clone(&self.sent),
            }))
        }
    }

    fn node(endpoint: &str, priority: i32, preferred: bool) -> BlockNodeConfig {
        BlockNodeConfig {
            endpoint: endpoint.to_string(),
            priority,
            preferred,
            batch_size: 64,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_broadcast_reaches_preferred_and_selected() {
        let transport = Arc::new(RecordingTransport::default());
        let pool = ConnectionPoolManager::new(
            ConnectionPoolConfig {
                max_secondary_connections: 1,
                ..Default::default()
            },
            vec![
                node("pref", 9, true),
                node("close", 1, false),
                node("far", 5, false),
            ],
            Arc::clone(&transport) as Arc<dyn BlockNodeTransport>,
        )
        .unwrap();

        pool.establish_connections().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        pool.broadcast(b"block-7").await;

        let receivers: HashSet<String> = transport
            .sent
            .lock()
            .iter()
            .map(|(endpoint, _)| endpoint.clone())
            .collect();
        let expected: HashSet<String> = ["pref".to_string(), "close".to_string()].into();
        assert_eq!(receivers, expected);
        assert_eq!(pool.state_of("far").await, Some(ConnectionState::Disconnected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_stream_misses_then_rejoins_broadcasts() {
        let transport = Arc::new(RecordingTransport::default());
        let pool = ConnectionPoolManager::new(
            ConnectionPoolConfig {
                initial_retry_delay_ms: 500,
                ..Default::default()
            },
            vec![node("only", 1, false)],
            Arc::clone(&transport) as Arc<dyn BlockNodeTransport>,
        )
        .unwrap();

        pool.establish_connections().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        pool.handle_stream_closed("only").await.unwrap();
        pool.broadcast(b"missed").await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        pool.broadcast(b"delivered").await;

        let sent = transport.sent.lock().clone();
        assert_eq!(sent, vec![("only".to_string(), b"delivered".to_vec())]);
    }
}
