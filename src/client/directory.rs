use crate::models::{ServiceMetadata, ServiceRecord};
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

const ENDPOINT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the indexer's read API, as used by dashboards and agents.
#[derive(Clone)]
pub struct DirectoryClient {
    base_url: String,
    client: Client,
}

#[derive(Debug, Clone)]
pub struct DiscoveredService {
    pub record: ServiceRecord,
    pub metadata: ServiceMetadata,
}

impl DiscoveredService {
    pub fn display_name(&self) -> String {
        self.metadata
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Service #{}", self.record.id))
    }
}

impl DirectoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub async fn list_services(&self) -> Result<Vec<ServiceRecord>> {
        let url = format!("{}/services", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach indexer at {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Indexer returned {}", response.status());
        }

        response
            .json()
            .await
            .context("Indexer returned an invalid service list")
    }

    /// Active services with their metadata parsed. Unparseable metadata
    /// yields an empty [`ServiceMetadata`] rather than an error.
    pub async fn discover(&self) -> Result<Vec<DiscoveredService>> {
        let services = self
            .list_services()
            .await?
            .into_iter()
            .filter(|record| record.is_active)
            .map(|record| DiscoveredService {
                metadata: ServiceMetadata::parse(&record.metadata),
                record,
            })
            .collect();

        Ok(services)
    }

    /// `HEAD` the service endpoint; any failure or timeout counts as down.
    pub async fn verify_endpoint(&self, url: &str) -> bool {
        match self
            .client
            .head(url)
            .timeout(ENDPOINT_PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!("Endpoint {} unreachable: {}", url, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use serde_json::json;

    fn listing() -> String {
        json!([
            {
                "id": 7,
                "provider": "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
                "farcaster_id": 42,
                "endpoint": "https://x",
                "metadata": "{\"name\":\"Bot\"}",
                "reputation": 0,
                "is_active": true,
                "last_indexed_block": 100
            },
            {
                "id": 8,
                "provider": "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb",
                "farcaster_id": 43,
                "endpoint": "https://y",
                "metadata": "not-json",
                "reputation": 3,
                "is_active": true,
                "last_indexed_block": 101
            },
            {
                "id": 9,
                "provider": "0xcccccccccccccccccccccccccccccccccccccccc",
                "farcaster_id": 44,
                "endpoint": "https://z",
                "metadata": "{}",
                "reputation": 0,
                "is_active": false,
                "last_indexed_block": 102
            }
        ])
        .to_string()
    }

    #[tokio::test]
    async fn discover_filters_inactive_and_tolerates_bad_metadata() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/services")
            .with_header("content-type", "application/json")
            .with_body(listing())
            .create_async()
            .await;

        let client = DirectoryClient::new(format!("{}/", server.url()));
        let services = client.discover().await.unwrap();

        assert_eq!(services.len(), 2);
        assert_eq!(services[0].display_name(), "Bot");
        assert_eq!(services[1].display_name(), "Service #8");
        assert_eq!(services[1].record.metadata, "not-json");
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/services")
            .with_status(500)
            .create_async()
            .await;

        let client = DirectoryClient::new(server.url());
        let err = client.list_services().await.unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn verify_endpoint_reports_liveness() {
        let mut server = Server::new_async().await;
        let _up = server.mock("HEAD", "/up").create_async().await;
        let _down = server
            .mock("HEAD", "/down")
            .with_status(503)
            .create_async()
            .await;

        let client = DirectoryClient::new(server.url());
        assert!(client.verify_endpoint(&format!("{}/up", server.url())).await);
        assert!(!client.verify_endpoint(&format!("{}/down", server.url())).await);
        assert!(!client.verify_endpoint("http://127.0.0.1:1/unreachable").await);
    }
}
