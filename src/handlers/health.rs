use crate::{
    models::HealthStatus,
    services::{IndexerStats, ProjectionStore, Reconciler},
};
use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct HealthState {
    pub store: Arc<dyn ProjectionStore>,
    pub stats: Arc<IndexerStats>,
    pub reconciler: Arc<Reconciler>,
}

pub async fn health_check(State(state): State<HealthState>) -> Json<HealthStatus> {
    // The snapshot keeps being served while passes fail, so a failing chain
    // only degrades the indexer.
    let status = match state.stats.last_pass_ok() {
        None => "starting",
        Some(true) => "healthy",
        Some(false) => "degraded",
    };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        reconciler_state: state.reconciler.state().as_str().to_string(),
        services_indexed: state.store.len(),
        last_head_block: state.stats.last_head_block(),
        uptime_seconds: state.stats.uptime_seconds(),
        timestamp: Utc::now(),
    })
}
