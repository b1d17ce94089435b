use crate::{error::IndexerError, models::ServiceRecord, services::ProjectionStore};
use axum::{extract::State, Json};
use std::sync::Arc;

/// Full snapshot of the projection store. Never touches the chain.
pub async fn list_services(
    State(store): State<Arc<dyn ProjectionStore>>,
) -> Result<Json<Vec<ServiceRecord>>, IndexerError> {
    let services = store.list_all()?;
    tracing::debug!("Serving {} services", services.len());
    Ok(Json(services))
}
