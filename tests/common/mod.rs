#![allow(dead_code)]

use asap_indexer::{
    error::IndexerError,
    models::{ChainLog, RegistryEvent, ServiceDetail, ServiceRecord},
    services::{
        ChainLogReader, IndexerStats, ProjectionStore, Reconciler, ReconcilerSettings,
        ServiceDetailFetcher, SledProjectionStore,
    },
};
use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

pub fn provider_aa() -> Address {
    Address::repeat_byte(0xaa)
}

pub fn registered(id: u64, block: u64) -> ChainLog {
    ChainLog {
        block_number: block,
        event: RegistryEvent::ServiceRegistered {
            service_id: id,
            provider: provider_aa(),
            farcaster_id: U256::from(42u64),
            endpoint: "https://x".to_string(),
        },
    }
}

pub fn detail(id: u64, metadata: &str) -> ServiceDetail {
    ServiceDetail {
        id,
        provider: provider_aa(),
        farcaster_id: 42,
        endpoint_url: "https://x".to_string(),
        metadata: metadata.to_string(),
        stake_amount: U256::from(100u64),
        reputation: 0,
        is_active: true,
        created_at: 1_700_000_000,
    }
}

/// Scripted chain: fixed head, fixed logs, optional failure and gate.
#[derive(Default)]
pub struct MockChain {
    pub head: Mutex<u64>,
    pub logs: Mutex<Vec<ChainLog>>,
    pub fail: AtomicBool,
    pub ranges: Mutex<Vec<(u64, u64)>>,
    pub gate: Option<Semaphore>,
}

impl MockChain {
    pub fn new(head: u64, logs: Vec<ChainLog>) -> Self {
        Self {
            head: Mutex::new(head),
            logs: Mutex::new(logs),
            ..Default::default()
        }
    }

    /// `head_block` waits for a permit on the returned chain's gate.
    pub fn gated(head: u64, logs: Vec<ChainLog>) -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(head, logs)
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChainLogReader for MockChain {
    async fn head_block(&self) -> Result<u64, IndexerError> {
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| IndexerError::ChainRead(e.to_string()))?
                .forget();
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(IndexerError::ChainRead("node unreachable".to_string()));
        }
        Ok(*self.head.lock().unwrap())
    }

    async fn fetch_logs(&self, from: u64, to: u64) -> Result<Vec<ChainLog>, IndexerError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(IndexerError::ChainRead("rate limited".to_string()));
        }
        self.ranges.lock().unwrap().push((from, to));
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.block_number >= from && log.block_number <= to)
            .cloned()
            .collect())
    }
}

/// Scripted `getService`: ids without an entry fail like a revert.
#[derive(Default)]
pub struct MockRegistry {
    pub details: Mutex<HashMap<u64, ServiceDetail>>,
    pub calls: AtomicUsize,
    /// Per-id latency of a read.
    pub delays: HashMap<u64, Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockRegistry {
    pub fn with(details: Vec<ServiceDetail>) -> Self {
        Self {
            details: Mutex::new(details.into_iter().map(|d| (d.id, d)).collect()),
            ..Default::default()
        }
    }

    pub fn set(&self, detail: ServiceDetail) {
        self.details.lock().unwrap().insert(detail.id, detail);
    }

    pub fn remove(&self, id: u64) {
        self.details.lock().unwrap().remove(&id);
    }

    /// Most reads that were ever outstanding at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceDetailFetcher for MockRegistry {
    async fn fetch(&self, id: u64) -> Result<ServiceDetail, IndexerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&id) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.details
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| IndexerError::detail(id, "execution reverted"))
    }
}

/// A store whose writes always fail.
pub struct BrokenStore;

impl ProjectionStore for BrokenStore {
    fn upsert(&self, _record: &ServiceRecord) -> Result<(), IndexerError> {
        Err(IndexerError::Storage(sled::Error::Unsupported(
            "disk full".to_string(),
        )))
    }

    fn list_all(&self) -> Result<Vec<ServiceRecord>, IndexerError> {
        Err(IndexerError::Storage(sled::Error::Unsupported(
            "disk full".to_string(),
        )))
    }

    fn get(&self, _id: u64) -> Result<Option<ServiceRecord>, IndexerError> {
        Ok(None)
    }

    fn len(&self) -> usize {
        0
    }
}

/// A temporary sled store that remembers the order of its upserts.
pub struct RecordingStore {
    inner: SledProjectionStore,
    upserts: Mutex<Vec<u64>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: SledProjectionStore::temporary().unwrap(),
            upserts: Mutex::new(Vec::new()),
        }
    }

    pub fn upserted_ids(&self) -> Vec<u64> {
        self.upserts.lock().unwrap().clone()
    }
}

impl ProjectionStore for RecordingStore {
    fn upsert(&self, record: &ServiceRecord) -> Result<(), IndexerError> {
        self.inner.upsert(record)?;
        self.upserts.lock().unwrap().push(record.id);
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<ServiceRecord>, IndexerError> {
        self.inner.list_all()
    }

    fn get(&self, id: u64) -> Result<Option<ServiceRecord>, IndexerError> {
        self.inner.get(id)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

pub fn settings(lookback_blocks: u64) -> ReconcilerSettings {
    ReconcilerSettings {
        lookback_blocks,
        poll_interval: Duration::from_millis(20),
        detail_concurrency: 4,
    }
}

pub struct Harness {
    pub chain: Arc<MockChain>,
    pub registry: Arc<MockRegistry>,
    pub store: Arc<dyn ProjectionStore>,
    pub stats: Arc<IndexerStats>,
    pub reconciler: Arc<Reconciler>,
}

impl Harness {
    pub fn new(chain: MockChain, registry: MockRegistry) -> Self {
        let store: Arc<dyn ProjectionStore> = Arc::new(SledProjectionStore::temporary().unwrap());
        Self::with_store(chain, registry, store, 5000)
    }

    pub fn with_store(
        chain: MockChain,
        registry: MockRegistry,
        store: Arc<dyn ProjectionStore>,
        lookback_blocks: u64,
    ) -> Self {
        let chain = Arc::new(chain);
        let registry = Arc::new(registry);
        let stats = Arc::new(IndexerStats::new());
        let reconciler = Arc::new(Reconciler::new(
            chain.clone(),
            registry.clone(),
            store.clone(),
            stats.clone(),
            settings(lookback_blocks),
        ));

        Self {
            chain,
            registry,
            store,
            stats,
            reconciler,
        }
    }
}
