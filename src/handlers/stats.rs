use crate::{models::Stats, services::IndexerStats};
use axum::{extract::State, Json};
use std::sync::Arc;

pub async fn get_stats(State(stats): State<Arc<IndexerStats>>) -> Json<Stats> {
    Json(stats.snapshot())
}
