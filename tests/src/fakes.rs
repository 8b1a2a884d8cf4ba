//! Fake outbound port implementations shared by the integration flows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;

use ll_02_block_stream::ports::{
    BlockItemWriter, BlockItemWriterFactory, BlockSigner, ChainStateStore, PortError,
};
use ll_02_block_stream::{BlockStreamConfig, BlockStreamService, InitialStateHash};
use shared_types::{
    BlockItem, ChainSnapshot, EventTransaction, Hash, RoundInfo, SemanticVersion, Timestamp,
    TransactionResult, ZERO_HASH,
};

/// Software version every test harness reports.
pub const TEST_VERSION: SemanticVersion = SemanticVersion::new(0, 1, 0);

static TRACING: Once = Once::new();

/// Installs a fmt subscriber once so `RUST_LOG` works under test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Everything every fake writer of one factory wrote, in write order.
#[derive(Default)]
pub struct StreamLog {
    frames: Mutex<Vec<(u64, Vec<u8>)>>,
    closed: Mutex<Vec<u64>>,
}

impl StreamLog {
    /// Raw frames written for one block, in order.
    pub fn frames_for(&self, block: u64) -> Vec<Vec<u8>> {
        self.frames
            .lock()
            .iter()
            .filter(|(b, _)| *b == block)
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    /// Decoded items written for one block, in order.
    pub fn items_for(&self, block: u64) -> Vec<BlockItem> {
        self.frames_for(block)
            .iter()
            .map(|frame| bincode::deserialize(frame).expect("frame decodes"))
            .collect()
    }

    /// Blocks whose writers were closed, in close order.
    pub fn closed_blocks(&self) -> Vec<u64> {
        self.closed.lock().clone()
    }
}

/// Writer factory recording every write into a shared [`StreamLog`],
/// optionally sleeping a random amount per write to shake out ordering
/// assumptions.
#[derive(Default)]
pub struct FakeWriterFactory {
    log: Arc<StreamLog>,
    max_write_delay: Option<Duration>,
}

impl FakeWriterFactory {
    /// Factory whose writers write immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory whose writers sleep up to `max` before each write.
    pub fn with_write_delay(max: Duration) -> Self {
        Self {
            log: Arc::default(),
            max_write_delay: Some(max),
        }
    }

    /// The shared log.
    pub fn log(&self) -> Arc<StreamLog> {
        Arc::clone(&self.log)
    }
}

struct FakeWriter {
    block: u64,
    log: Arc<StreamLog>,
    max_write_delay: Option<Duration>,
}

#[async_trait]
impl BlockItemWriter for FakeWriter {
    async fn write_items(&mut self, frames: Vec<Vec<u8>>) -> Result<(), PortError> {
        if let Some(max) = self.max_write_delay {
            let nanos = rand::thread_rng().gen_range(0..max.as_nanos().max(1)) as u64;
            tokio::time::sleep(Duration::from_nanos(nanos)).await;
        }
        let mut log = self.log.frames.lock();
        for frame in frames {
            log.push((self.block, frame));
        }
        Ok(())
    }

    async fn close_block(&mut self) -> Result<(), PortError> {
        self.log.closed.lock().push(self.block);
        Ok(())
    }
}

#[async_trait]
impl BlockItemWriterFactory for FakeWriterFactory {
    async fn open_block(&self, block_number: u64) -> Result<Box<dyn BlockItemWriter>, PortError> {
        Ok(Box::new(FakeWriter {
            block: block_number,
            log: Arc::clone(&self.log),
            max_write_delay: self.max_write_delay,
        }))
    }
}

/// Signer with controllable readiness.
///
/// In auto mode it returns a signature derived from the hash right away;
/// in manual mode `sign` never resolves and tests deliver signatures
/// through `handle_signature` themselves.
pub struct FakeSigner {
    ready: AtomicBool,
    auto: bool,
}

impl FakeSigner {
    /// Ready signer that signs immediately.
    pub fn auto() -> Self {
        Self {
            ready: AtomicBool::new(true),
            auto: true,
        }
    }

    /// Signer that never delivers; drive signatures by hand.
    pub fn manual(ready: bool) -> Self {
        Self {
            ready: AtomicBool::new(ready),
            auto: false,
        }
    }

    /// Flips readiness.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// The signature the auto signer produces for a hash.
    pub fn signature_for(hash: &Hash) -> Vec<u8> {
        let mut signature = b"sig:".to_vec();
        signature.extend_from_slice(hash.as_bytes());
        signature
    }
}

#[async_trait]
impl BlockSigner for FakeSigner {
    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn sign(&self, hash: Hash) -> Result<Vec<u8>, PortError> {
        if self.auto {
            Ok(Self::signature_for(&hash))
        } else {
            std::future::pending().await
        }
    }
}

/// In-memory chain state store.
#[derive(Default)]
pub struct FakeStateStore {
    committed: Mutex<Vec<ChainSnapshot>>,
}

impl FakeStateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every committed snapshot, in commit order.
    pub fn committed(&self) -> Vec<ChainSnapshot> {
        self.committed.lock().clone()
    }
}

#[async_trait]
impl ChainStateStore for FakeStateStore {
    async fn commit(&self, snapshot: &ChainSnapshot) -> Result<(), PortError> {
        self.committed.lock().push(snapshot.clone());
        Ok(())
    }
}

/// A block stream service wired to fakes, plus handles to observe them.
pub struct Harness {
    /// The service under test.
    pub service: BlockStreamService,
    /// The signer, for readiness flips.
    pub signer: Arc<FakeSigner>,
    /// The state store, for committed snapshots.
    pub store: Arc<FakeStateStore>,
    /// The stream log shared by every writer.
    pub log: Arc<StreamLog>,
}

impl Harness {
    /// Harness starting at genesis.
    pub fn new(config: BlockStreamConfig, signer: FakeSigner) -> Self {
        Self::resuming(
            config,
            signer,
            FakeWriterFactory::new(),
            ChainSnapshot::genesis(TEST_VERSION),
            InitialStateHash::ready(0, ZERO_HASH),
            ZERO_HASH,
        )
    }

    /// Harness resuming from an arbitrary snapshot.
    pub fn resuming(
        config: BlockStreamConfig,
        signer: FakeSigner,
        factory: FakeWriterFactory,
        snapshot: ChainSnapshot,
        initial_state_hash: InitialStateHash,
        last_block_hash: Hash,
    ) -> Self {
        init_tracing();
        let signer = Arc::new(signer);
        let store = Arc::new(FakeStateStore::new());
        let log = factory.log();
        let service = BlockStreamService::new(
            config,
            TEST_VERSION,
            Arc::new(factory),
            Arc::clone(&signer) as Arc<dyn BlockSigner>,
            Arc::clone(&store) as Arc<dyn ChainStateStore>,
            snapshot,
            initial_state_hash,
        )
        .expect("valid test configuration");
        service.init_last_block_hash(last_block_hash);
        Self {
            service,
            signer,
            store,
            log,
        }
    }
}

/// A non-freeze round.
pub fn round(number: u64, seconds: i64) -> RoundInfo {
    RoundInfo {
        number,
        consensus_timestamp: Timestamp::new(seconds, 0),
        is_freeze_round: false,
    }
}

/// A freeze round.
pub fn freeze_round(number: u64, seconds: i64) -> RoundInfo {
    RoundInfo {
        is_freeze_round: true,
        ..round(number, seconds)
    }
}

/// An event transaction item with an identifiable payload.
pub fn transaction_item(seconds: i64, payload: u8) -> BlockItem {
    BlockItem::EventTransaction(EventTransaction {
        consensus_timestamp: Timestamp::new(seconds, 0),
        transaction: vec![payload],
    })
}

/// A transaction result item with an identifiable payload.
pub fn result_item(seconds: i64, payload: u8) -> BlockItem {
    BlockItem::TransactionResult(TransactionResult {
        consensus_timestamp: Timestamp::new(seconds, 0),
        result: vec![payload],
    })
}

/// Polls `condition` until it holds or a couple of seconds pass.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
