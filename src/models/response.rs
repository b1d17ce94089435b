use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub reconciler_state: String,
    pub services_indexed: usize,
    pub last_head_block: Option<u64>,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Stats {
    pub passes_completed: u64,
    pub passes_abandoned: u64,
    pub passes_skipped: u64,
    pub records_upserted: u64,
    pub detail_failures: u64,
    pub last_head_block: Option<u64>,
    pub last_pass_at: Option<DateTime<Utc>>,
    pub last_pass_ok: Option<bool>,
}
