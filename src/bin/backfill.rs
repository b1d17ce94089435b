use anyhow::{Context, Result};
use asap_indexer::{app::Indexer, config::Config};

/// One-off wider scan for registrations older than the lookback window.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let from_block: u64 = std::env::var("BACKFILL_FROM_BLOCK")
        .context("BACKFILL_FROM_BLOCK required")?
        .parse()
        .context("Invalid BACKFILL_FROM_BLOCK")?;

    tracing::info!(
        "Backfilling {:?} from block {} in windows of {} blocks",
        config.registry_address,
        from_block,
        config.lookback_blocks
    );

    let indexer = Indexer::from_config(&config)?;
    let report = indexer
        .reconciler
        .backfill(from_block)
        .await
        .context("Backfill failed")?;
    indexer.store.flush()?;

    println!("Backfill complete");
    println!("  blocks:   {:?}..={:?}", report.from_block, report.to_block);
    println!("  logs:     {}", report.logs_seen);
    println!("  upserted: {}", report.upserted);
    if !report.failed.is_empty() {
        println!("  failed:   {:?}", report.failed);
    }
    println!("  stored:   {}", indexer.store.len());

    Ok(())
}
