use crate::{
    config::Config,
    error::IndexerError,
    models::{ChainLog, ServiceMetadata, ServiceRecord},
    services::{ChainLogReader, IndexerStats, ProjectionStore, ServiceDetailFetcher},
};
use futures::{stream, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReconcilerState {
    Idle = 0,
    Scanning = 1,
    Detailing = 2,
}

impl ReconcilerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ReconcilerState::Scanning,
            2 => ReconcilerState::Detailing,
            _ => ReconcilerState::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcilerState::Idle => "idle",
            ReconcilerState::Scanning => "scanning",
            ReconcilerState::Detailing => "detailing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Completed,
    /// The log query failed; nothing was fetched or written.
    Abandoned,
    /// Another pass held the guard.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub outcome: PassOutcome,
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
    pub logs_seen: usize,
    pub upserted: usize,
    pub failed: Vec<u64>,
}

impl PassReport {
    fn new(outcome: PassOutcome) -> Self {
        Self {
            outcome,
            from_block: None,
            to_block: None,
            logs_seen: 0,
            upserted: 0,
            failed: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    pub lookback_blocks: u64,
    pub poll_interval: Duration,
    pub detail_concurrency: usize,
}

impl From<&Config> for ReconcilerSettings {
    fn from(config: &Config) -> Self {
        Self {
            lookback_blocks: config.lookback_blocks,
            poll_interval: config.poll_interval,
            detail_concurrency: config.detail_concurrency,
        }
    }
}

/// Folds registry logs into the projection store.
///
/// Each pass scans the lookback window ending at the chain head, re-reads
/// every service mentioned in it, and upserts the result. A failed log query
/// abandons the pass; a failed detail read only skips that service. Storage
/// failures are returned to the caller and are meant to stop the process.
pub struct Reconciler {
    reader: Arc<dyn ChainLogReader>,
    fetcher: Arc<dyn ServiceDetailFetcher>,
    store: Arc<dyn ProjectionStore>,
    stats: Arc<IndexerStats>,
    settings: ReconcilerSettings,
    state: AtomicU8,
    pass_guard: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        reader: Arc<dyn ChainLogReader>,
        fetcher: Arc<dyn ServiceDetailFetcher>,
        store: Arc<dyn ProjectionStore>,
        stats: Arc<IndexerStats>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            reader,
            fetcher,
            store,
            stats,
            settings,
            state: AtomicU8::new(ReconcilerState::Idle as u8),
            pass_guard: Mutex::new(()),
        }
    }

    pub fn state(&self) -> ReconcilerState {
        ReconcilerState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn enter(&self, state: ReconcilerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Runs one pass now, eagerly, then one per poll interval until
    /// `shutdown` resolves. A pass in progress always finishes first.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<(), IndexerError> {
        let mut ticker = tokio::time::interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(
            "Reconciler started (interval {:?}, lookback {} blocks)",
            self.settings.poll_interval,
            self.settings.lookback_blocks
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Reconciler stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_pass().await {
                        tracing::error!(error = %e, "Projection write failed, stopping reconciler");
                        return Err(e);
                    }
                }
            }
        }
    }

    pub async fn run_pass(&self) -> Result<PassReport, IndexerError> {
        let Ok(_guard) = self.pass_guard.try_lock() else {
            tracing::debug!("Reconciliation pass already running, skipping");
            self.stats.record_skipped();
            return Ok(PassReport::new(PassOutcome::Skipped));
        };
        let _idle = IdleOnDrop(&self.state);

        tracing::info!("Scanning registry logs");
        self.enter(ReconcilerState::Scanning);

        let (from, to, logs) = match self.scan_lookback().await {
            Ok(scan) => scan,
            Err(e) => {
                tracing::warn!(error = %e, "Log scan failed, abandoning pass");
                self.stats.record_pass(false);
                return Ok(PassReport::new(PassOutcome::Abandoned));
            }
        };

        let mut report = PassReport::new(PassOutcome::Completed);
        report.from_block = Some(from);
        report.to_block = Some(to);
        report.logs_seen = logs.len();

        self.apply(&logs, &mut report).await?;
        self.stats.record_pass(true);

        tracing::info!(
            from,
            to,
            logs = report.logs_seen,
            upserted = report.upserted,
            failed = report.failed.len(),
            "Reconciliation pass complete"
        );

        Ok(report)
    }

    /// Scans `[from_block, head]` in lookback-sized windows. Unlike a
    /// periodic pass, a log query failure aborts the whole backfill.
    pub async fn backfill(&self, from_block: u64) -> Result<PassReport, IndexerError> {
        let Ok(_guard) = self.pass_guard.try_lock() else {
            return Err(IndexerError::Internal(
                "a reconciliation pass is already running".to_string(),
            ));
        };
        let _idle = IdleOnDrop(&self.state);

        self.enter(ReconcilerState::Scanning);
        let head = self.reader.head_block().await?;
        self.stats.record_head(head);

        let mut report = PassReport::new(PassOutcome::Completed);
        report.from_block = Some(from_block);
        report.to_block = Some(head);

        let window = self.settings.lookback_blocks.max(1);
        let mut start = from_block;
        while start <= head {
            let end = start.saturating_add(window - 1).min(head);

            self.enter(ReconcilerState::Scanning);
            let logs = self.reader.fetch_logs(start, end).await?;
            tracing::info!(from = start, to = end, logs = logs.len(), "Backfill window scanned");

            report.logs_seen += logs.len();
            self.apply(&logs, &mut report).await?;

            if end == u64::MAX {
                break;
            }
            start = end + 1;
        }

        self.stats.record_pass(true);
        tracing::info!(
            from = from_block,
            to = head,
            upserted = report.upserted,
            failed = report.failed.len(),
            "Backfill complete"
        );

        Ok(report)
    }

    async fn scan_lookback(&self) -> Result<(u64, u64, Vec<ChainLog>), IndexerError> {
        let head = self.reader.head_block().await?;
        self.stats.record_head(head);

        let from = head.saturating_sub(self.settings.lookback_blocks);
        let logs = self.reader.fetch_logs(from, head).await?;
        Ok((from, head, logs))
    }

    async fn apply(&self, logs: &[ChainLog], report: &mut PassReport) -> Result<(), IndexerError> {
        self.enter(ReconcilerState::Detailing);

        let fetcher = &self.fetcher;
        let mut fetched = stream::iter(collapse(logs))
            .map(|(id, block)| async move {
                tracing::debug!(service_id = id, "Fetching service detail");
                (id, block, fetcher.fetch(id).await)
            })
            .buffered(self.settings.detail_concurrency.max(1));

        while let Some((id, block, result)) = fetched.next().await {
            match result {
                Ok(detail) => {
                    let record = ServiceRecord::from_detail(detail, block);
                    self.store.upsert(&record)?;
                    self.stats.record_upsert();
                    report.upserted += 1;

                    let metadata = ServiceMetadata::parse(&record.metadata);
                    tracing::info!(
                        service_id = id,
                        block,
                        name = metadata.name().unwrap_or("<unnamed>"),
                        "Indexed service"
                    );
                }
                Err(e) => {
                    tracing::warn!(service_id = id, error = %e, "Failed to read service, skipping");
                    self.stats.record_detail_failure();
                    report.failed.push(id);
                }
            }
        }

        Ok(())
    }
}

/// One `(service_id, block)` target per id, in first-seen order, carrying
/// the highest block the id was mentioned in.
fn collapse(logs: &[ChainLog]) -> Vec<(u64, u64)> {
    let mut order = Vec::new();
    let mut latest: HashMap<u64, u64> = HashMap::new();

    for log in logs {
        let id = log.service_id();
        latest
            .entry(id)
            .and_modify(|block| *block = (*block).max(log.block_number))
            .or_insert_with(|| {
                order.push(id);
                log.block_number
            });
    }

    order
        .into_iter()
        .map(|id| (id, latest[&id]))
        .collect()
}

struct IdleOnDrop<'a>(&'a AtomicU8);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(ReconcilerState::Idle as u8, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegistryEvent;
    use ethers::types::{Address, U256};

    fn registered(id: u64, block: u64) -> ChainLog {
        ChainLog {
            block_number: block,
            event: RegistryEvent::ServiceRegistered {
                service_id: id,
                provider: Address::zero(),
                farcaster_id: U256::one(),
                endpoint: String::new(),
            },
        }
    }

    fn attested(id: u64, block: u64) -> ChainLog {
        ChainLog {
            block_number: block,
            event: RegistryEvent::AttestationReceived {
                service_id: id,
                attester: Address::zero(),
                rating: 5,
                review_cid: String::new(),
            },
        }
    }

    #[test]
    fn collapse_keeps_first_seen_order_and_latest_block() {
        let logs = vec![
            registered(3, 10),
            registered(1, 11),
            attested(3, 15),
            attested(2, 12),
            attested(1, 9),
        ];
        assert_eq!(collapse(&logs), vec![(3, 15), (1, 11), (2, 12)]);
    }

    #[test]
    fn collapse_of_nothing_is_nothing() {
        assert!(collapse(&[]).is_empty());
    }

    #[test]
    fn state_round_trips_through_atomic() {
        for state in [
            ReconcilerState::Idle,
            ReconcilerState::Scanning,
            ReconcilerState::Detailing,
        ] {
            assert_eq!(ReconcilerState::from_u8(state as u8), state);
        }
        assert_eq!(ReconcilerState::Detailing.as_str(), "detailing");
    }
}
