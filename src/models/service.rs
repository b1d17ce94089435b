use crate::contracts::Service;
use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Locally projected view of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: u64,
    pub provider: Address,
    pub farcaster_id: u64,
    pub endpoint: String,
    /// Stored verbatim; see [`ServiceMetadata`] for the defensive view.
    pub metadata: String,
    pub reputation: u64,
    pub is_active: bool,
    pub last_indexed_block: u64,
}

impl ServiceRecord {
    pub fn from_detail(detail: ServiceDetail, block_number: u64) -> Self {
        Self {
            id: detail.id,
            provider: detail.provider,
            farcaster_id: detail.farcaster_id,
            endpoint: detail.endpoint_url,
            metadata: detail.metadata,
            reputation: detail.reputation,
            is_active: detail.is_active,
            last_indexed_block: block_number,
        }
    }
}

/// Result of `getService(id)`, narrowed from the raw contract tuple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDetail {
    pub id: u64,
    pub provider: Address,
    pub farcaster_id: u64,
    pub endpoint_url: String,
    pub metadata: String,
    pub stake_amount: U256,
    pub reputation: u64,
    pub is_active: bool,
    pub created_at: u64,
}

impl TryFrom<Service> for ServiceDetail {
    type Error = String;

    fn try_from(raw: Service) -> Result<Self, Self::Error> {
        Ok(Self {
            id: narrow(raw.id, "id")?,
            provider: raw.provider,
            farcaster_id: narrow(raw.farcaster_id, "farcasterId")?,
            endpoint_url: raw.endpoint_url,
            metadata: raw.metadata,
            stake_amount: raw.stake_amount,
            reputation: narrow(raw.reputation, "reputation")?,
            is_active: raw.is_active,
            created_at: narrow(raw.created_at, "createdAt")?,
        })
    }
}

pub(crate) fn narrow(value: U256, field: &str) -> Result<u64, String> {
    if value > U256::from(u64::MAX) {
        return Err(format!("{} out of range: {}", field, value));
    }
    Ok(value.as_u64())
}

/// Display-side view over the free-form metadata string.
///
/// Anything that is not a JSON object is treated as "no metadata" rather
/// than an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceMetadata {
    fields: serde_json::Map<String, serde_json::Value>,
}

impl ServiceMetadata {
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Object(fields)) => Self { fields },
            _ => Self::default(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(|v| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
