use ethers::types::{Address, U256};

/// A registry log, decoded and validated at the RPC boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLog {
    pub block_number: u64,
    pub event: RegistryEvent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    ServiceRegistered {
        service_id: u64,
        provider: Address,
        /// Caller-supplied at registration, so kept at full width.
        farcaster_id: U256,
        endpoint: String,
    },
    AttestationReceived {
        service_id: u64,
        attester: Address,
        rating: u8,
        review_cid: String,
    },
}

impl RegistryEvent {
    pub fn service_id(&self) -> u64 {
        match self {
            RegistryEvent::ServiceRegistered { service_id, .. }
            | RegistryEvent::AttestationReceived { service_id, .. } => *service_id,
        }
    }
}

impl ChainLog {
    pub fn service_id(&self) -> u64 {
        self.event.service_id()
    }
}
