use crate::{
    contracts::{AttestationReceivedFilter, ServiceRegisteredFilter},
    error::IndexerError,
    models::{narrow, ChainLog, RegistryEvent},
};
use async_trait::async_trait;
use ethers::{
    abi::RawLog,
    contract::EthEvent,
    providers::{Http, Middleware, Provider, ProviderError},
    types::{Address, Filter, Log, ValueOrArray, H256, U256},
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Read-only access to registry logs on the remote node.
#[async_trait]
pub trait ChainLogReader: Send + Sync {
    async fn head_block(&self) -> Result<u64, IndexerError>;

    /// Registry logs in the inclusive range `[from, to]`.
    async fn fetch_logs(&self, from: u64, to: u64) -> Result<Vec<ChainLog>, IndexerError>;
}

pub struct EthereumService {
    primary: Arc<Provider<Http>>,
    fallback: Option<Arc<Provider<Http>>>,
    registry: Address,
    timeout: Duration,
}

impl EthereumService {
    pub fn new(
        rpc_url: &str,
        fallback_url: Option<&str>,
        registry: Address,
        timeout: Duration,
    ) -> Result<Self, IndexerError> {
        let primary = Arc::new(connect(rpc_url)?);
        let fallback = fallback_url.map(connect).transpose()?.map(Arc::new);

        Ok(Self {
            primary,
            fallback,
            registry,
            timeout,
        })
    }

    /// The primary provider, shared with the detail reader.
    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.primary.clone()
    }

    fn filter(&self, from: u64, to: u64) -> Filter {
        let topics = vec![
            Some(ServiceRegisteredFilter::signature()),
            Some(AttestationReceivedFilter::signature()),
        ];
        Filter::new()
            .address(self.registry)
            .topic0(ValueOrArray::Array(topics))
            .from_block(from)
            .to_block(to)
    }

    /// Runs `call` against the primary provider, then once against the
    /// fallback if one is configured.
    async fn with_fallback<'a, T, F, Fut>(&'a self, what: &str, call: F) -> Result<T, IndexerError>
    where
        F: Fn(&'a Provider<Http>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        match self.timed(call(self.primary.as_ref())).await {
            Ok(value) => Ok(value),
            Err(e) => match &self.fallback {
                Some(fallback) => {
                    tracing::warn!("Primary RPC failed for {}: {}, trying fallback", what, e);
                    self.timed(call(fallback.as_ref())).await
                }
                None => Err(e),
            },
        }
    }

    async fn timed<T, Fut>(&self, fut: Fut) -> Result<T, IndexerError>
    where
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(IndexerError::ChainRead(e.to_string())),
            Err(_) => Err(IndexerError::ChainRead(format!(
                "timed out after {:?}",
                self.timeout
            ))),
        }
    }
}

#[async_trait]
impl ChainLogReader for EthereumService {
    async fn head_block(&self) -> Result<u64, IndexerError> {
        let head = self
            .with_fallback("eth_blockNumber", |p| p.get_block_number())
            .await?;
        Ok(head.as_u64())
    }

    async fn fetch_logs(&self, from: u64, to: u64) -> Result<Vec<ChainLog>, IndexerError> {
        if from > to {
            return Ok(Vec::new());
        }

        let filter = self.filter(from, to);
        let logs = self
            .with_fallback("eth_getLogs", |p| {
                let filter = filter.clone();
                async move { p.get_logs(&filter).await }
            })
            .await?;

        tracing::debug!(from, to, count = logs.len(), "Fetched registry logs");

        logs.iter().filter_map(|log| decode_log(log).transpose()).collect()
    }
}

fn connect(url: &str) -> Result<Provider<Http>, IndexerError> {
    Provider::<Http>::try_from(url)
        .map_err(|e| IndexerError::Config(format!("Invalid RPC URL {}: {}", url, e)))
}

/// Converts a raw log into a typed registry event.
///
/// A log whose service id does not fit in a `u64` names nothing the
/// projection can hold; it is skipped with a warning and yields `None`.
pub fn decode_log(log: &Log) -> Result<Option<ChainLog>, IndexerError> {
    let malformed = |reason: String| IndexerError::ChainRead(format!("malformed log: {}", reason));

    let block_number = log
        .block_number
        .ok_or_else(|| malformed("missing block number".to_string()))?
        .as_u64();
    let topic0: H256 = *log
        .topics
        .first()
        .ok_or_else(|| malformed("missing topic0".to_string()))?;
    let raw = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };

    let event = if topic0 == ServiceRegisteredFilter::signature() {
        let decoded = ServiceRegisteredFilter::decode_log(&raw).map_err(|e| malformed(e.to_string()))?;
        let Some(service_id) = service_id(decoded.service_id, block_number) else {
            return Ok(None);
        };
        RegistryEvent::ServiceRegistered {
            service_id,
            provider: decoded.provider,
            farcaster_id: decoded.farcaster_id,
            endpoint: decoded.endpoint,
        }
    } else if topic0 == AttestationReceivedFilter::signature() {
        let decoded = AttestationReceivedFilter::decode_log(&raw).map_err(|e| malformed(e.to_string()))?;
        let Some(service_id) = service_id(decoded.service_id, block_number) else {
            return Ok(None);
        };
        RegistryEvent::AttestationReceived {
            service_id,
            attester: decoded.attester,
            rating: decoded.rating,
            review_cid: decoded.review_cid,
        }
    } else {
        return Err(malformed(format!("unexpected topic {:?}", topic0)));
    };

    Ok(Some(ChainLog { block_number, event }))
}

fn service_id(raw: U256, block: u64) -> Option<u64> {
    match narrow(raw, "serviceId") {
        Ok(id) => Some(id),
        Err(reason) => {
            tracing::warn!(block, %reason, "Skipping registry log");
            None
        }
    }
}
