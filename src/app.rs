use crate::{
    config::Config,
    error::IndexerError,
    handlers::*,
    services::{
        EthereumService, IndexerStats, ProjectionStore, Reconciler, ReconcilerSettings,
        RegistryReader, SledProjectionStore,
    },
};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

/// The wired-up indexer: durable store, chain readers and the reconciler.
pub struct Indexer {
    pub store: Arc<dyn ProjectionStore>,
    pub stats: Arc<IndexerStats>,
    pub reconciler: Arc<Reconciler>,
}

impl Indexer {
    pub fn from_config(config: &Config) -> Result<Self, IndexerError> {
        let store: Arc<dyn ProjectionStore> = Arc::new(SledProjectionStore::open(&config.db_path)?);

        let ethereum = EthereumService::new(
            &config.rpc_url,
            config.rpc_fallback.as_deref(),
            config.registry_address,
            config.log_timeout,
        )?;
        let registry = RegistryReader::new(
            ethereum.provider(),
            config.registry_address,
            config.detail_timeout,
        );

        let stats = Arc::new(IndexerStats::new());
        let reconciler = Arc::new(Reconciler::new(
            Arc::new(ethereum),
            Arc::new(registry),
            store.clone(),
            stats.clone(),
            ReconcilerSettings::from(config),
        ));

        Ok(Self {
            store,
            stats,
            reconciler,
        })
    }

    pub fn router(&self) -> Router {
        router(
            self.store.clone(),
            self.stats.clone(),
            self.reconciler.clone(),
        )
    }
}

/// Read-side router. Every route reads local state only.
pub fn router(
    store: Arc<dyn ProjectionStore>,
    stats: Arc<IndexerStats>,
    reconciler: Arc<Reconciler>,
) -> Router {
    let health_state = HealthState {
        store: store.clone(),
        stats: stats.clone(),
        reconciler,
    };

    Router::new()
        .route("/health", get(health_check))
        .with_state(health_state)

        .route("/stats", get(get_stats))
        .with_state(stats)

        .route("/services", get(list_services))
        .with_state(store)

        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
