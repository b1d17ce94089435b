use anyhow::Result;
use asap_indexer::client::DirectoryClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    let base_url = std::env::var("ASAP_INDEXER_URL")
        .unwrap_or_else(|_| "http://localhost:3000".to_string());

    println!("ASAP Directory Probe");
    println!("====================");
    println!("Indexer: {}", base_url);
    println!();

    let client = DirectoryClient::new(&base_url);
    let services = client.discover().await?;

    if services.is_empty() {
        println!("No active services indexed yet.");
        return Ok(());
    }

    for service in &services {
        let alive = client.verify_endpoint(&service.record.endpoint).await;
        println!(
            "[{}] #{} {} (fid {}, reputation {})",
            if alive { "UP" } else { "DOWN" },
            service.record.id,
            service.display_name(),
            service.record.farcaster_id,
            service.record.reputation,
        );
        println!("      endpoint: {}", service.record.endpoint);
        println!("      provider: {:?}", service.record.provider);
    }

    println!();
    println!("{} active service(s)", services.len());

    Ok(())
}
