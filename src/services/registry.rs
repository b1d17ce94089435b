use crate::{contracts::ServiceRegistry, error::IndexerError, models::ServiceDetail};
use async_trait::async_trait;
use ethers::{
    providers::{Http, Provider},
    types::{Address, U256},
};
use std::sync::Arc;
use std::time::Duration;

/// Point-in-time read of a single service's on-chain record.
#[async_trait]
pub trait ServiceDetailFetcher: Send + Sync {
    async fn fetch(&self, id: u64) -> Result<ServiceDetail, IndexerError>;
}

pub struct RegistryReader {
    registry: ServiceRegistry<Provider<Http>>,
    timeout: Duration,
}

impl RegistryReader {
    pub fn new(provider: Arc<Provider<Http>>, registry_address: Address, timeout: Duration) -> Self {
        tracing::info!(
            "Registry reader initialized for {:?} (timeout {:?})",
            registry_address,
            timeout
        );

        Self {
            registry: ServiceRegistry::new(registry_address, provider),
            timeout,
        }
    }
}

#[async_trait]
impl ServiceDetailFetcher for RegistryReader {
    async fn fetch(&self, id: u64) -> Result<ServiceDetail, IndexerError> {
        let call = self.registry.get_service(U256::from(id));

        let raw = match tokio::time::timeout(self.timeout, call.call()).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(IndexerError::detail(id, e)),
            Err(_) => {
                return Err(IndexerError::detail(
                    id,
                    format!("timed out after {:?}", self.timeout),
                ))
            }
        };

        // Unknown ids come back as a zeroed struct rather than a revert.
        if raw.id.is_zero() {
            return Err(IndexerError::detail(id, "service does not exist"));
        }

        let detail = ServiceDetail::try_from(raw).map_err(|reason| IndexerError::detail(id, reason))?;
        if detail.id != id {
            return Err(IndexerError::detail(
                id,
                format!("registry returned service #{}", detail.id),
            ));
        }

        Ok(detail)
    }
}
