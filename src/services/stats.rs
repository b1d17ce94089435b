use crate::models::Stats;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

const UNSET: u64 = u64::MAX;

/// Counters describing reconciliation progress, shared with the HTTP layer.
pub struct IndexerStats {
    passes_completed: AtomicU64,
    passes_abandoned: AtomicU64,
    passes_skipped: AtomicU64,
    records_upserted: AtomicU64,
    detail_failures: AtomicU64,
    last_head_block: AtomicU64,
    last_pass_at: AtomicI64,
    last_pass_ok: AtomicBool,
    start_time: Instant,
}

impl IndexerStats {
    pub fn new() -> Self {
        Self {
            passes_completed: AtomicU64::new(0),
            passes_abandoned: AtomicU64::new(0),
            passes_skipped: AtomicU64::new(0),
            records_upserted: AtomicU64::new(0),
            detail_failures: AtomicU64::new(0),
            last_head_block: AtomicU64::new(UNSET),
            last_pass_at: AtomicI64::new(0),
            last_pass_ok: AtomicBool::new(false),
            start_time: Instant::now(),
        }
    }

    pub fn record_head(&self, block: u64) {
        self.last_head_block.store(block, Ordering::SeqCst);
    }

    pub fn record_upsert(&self) {
        self.records_upserted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_detail_failure(&self) {
        self.detail_failures.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_skipped(&self) {
        self.passes_skipped.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_pass(&self, ok: bool) {
        if ok {
            self.passes_completed.fetch_add(1, Ordering::SeqCst);
        } else {
            self.passes_abandoned.fetch_add(1, Ordering::SeqCst);
        }
        self.last_pass_ok.store(ok, Ordering::SeqCst);
        self.last_pass_at
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    pub fn last_head_block(&self) -> Option<u64> {
        match self.last_head_block.load(Ordering::SeqCst) {
            UNSET => None,
            block => Some(block),
        }
    }

    pub fn last_pass_at(&self) -> Option<DateTime<Utc>> {
        match self.last_pass_at.load(Ordering::SeqCst) {
            0 => None,
            millis => Utc.timestamp_millis_opt(millis).single(),
        }
    }

    /// `None` until the first pass has finished.
    pub fn last_pass_ok(&self) -> Option<bool> {
        self.last_pass_at()
            .map(|_| self.last_pass_ok.load(Ordering::SeqCst))
    }

    pub fn snapshot(&self) -> Stats {
        Stats {
            passes_completed: self.passes_completed.load(Ordering::SeqCst),
            passes_abandoned: self.passes_abandoned.load(Ordering::SeqCst),
            passes_skipped: self.passes_skipped.load(Ordering::SeqCst),
            records_upserted: self.records_upserted.load(Ordering::SeqCst),
            detail_failures: self.detail_failures.load(Ordering::SeqCst),
            last_head_block: self.last_head_block(),
            last_pass_at: self.last_pass_at(),
            last_pass_ok: self.last_pass_ok(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for IndexerStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_stats_have_no_pass() {
        let stats = IndexerStats::new();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.passes_completed, 0);
        assert_eq!(snapshot.last_head_block, None);
        assert_eq!(snapshot.last_pass_ok, None);
        assert!(snapshot.last_pass_at.is_none());
    }

    #[test]
    fn abandoned_pass_is_reported_as_not_ok() {
        let stats = IndexerStats::new();
        stats.record_pass(true);
        stats.record_pass(false);
        stats.record_head(900);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.passes_completed, 1);
        assert_eq!(snapshot.passes_abandoned, 1);
        assert_eq!(snapshot.last_pass_ok, Some(false));
        assert_eq!(snapshot.last_head_block, Some(900));
    }
}
