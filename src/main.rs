use anyhow::{Context, Result};
use asap_indexer::{app::Indexer, config::Config};
use std::future::IntoFuture;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting ASAP indexer v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {:?}", config.environment);
    tracing::info!("Registry: {:?}", config.registry_address);

    let indexer = Indexer::from_config(&config).context("Failed to initialize indexer")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut reconciler = tokio::spawn({
        let reconciler = indexer.reconciler.clone();
        let shutdown = wait_for_shutdown(shutdown_rx.clone());
        async move { reconciler.run(shutdown).await }
    });

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Services: http://{}/services", addr);
    tracing::info!("Health check: http://{}/health", addr);

    let server = axum::serve(listener, indexer.router())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
        .into_future();

    tokio::select! {
        served = server => {
            served?;
            // Let an in-flight pass finish before closing the store.
            reconciler.await??;
        }
        stopped = &mut reconciler => {
            stopped?.context("Reconciler stopped on a storage failure")?;
        }
    }

    indexer.store.flush()?;
    tracing::info!("Projection store flushed");

    Ok(())
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl+c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down gracefully...");
}
