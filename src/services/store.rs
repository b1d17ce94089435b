use crate::{error::IndexerError, models::ServiceRecord};
use std::path::Path;

const SERVICES_TREE: &str = "services";

/// Durable table of service projections keyed by service id.
///
/// Writes for different ids must not block each other; writes for the same
/// id are serialized and the last one to complete wins.
pub trait ProjectionStore: Send + Sync {
    fn upsert(&self, record: &ServiceRecord) -> Result<(), IndexerError>;

    /// Snapshot of every record, ordered by id.
    fn list_all(&self) -> Result<Vec<ServiceRecord>, IndexerError>;

    fn get(&self, id: u64) -> Result<Option<ServiceRecord>, IndexerError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn flush(&self) -> Result<(), IndexerError> {
        Ok(())
    }
}

pub struct SledProjectionStore {
    db: sled::Db,
    services: sled::Tree,
}

impl SledProjectionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IndexerError> {
        let db = sled::open(path.as_ref())?;
        let store = Self::from_db(db)?;

        tracing::info!(
            path = %path.as_ref().display(),
            services = store.len(),
            "Projection store opened"
        );

        Ok(store)
    }

    /// In-memory database that disappears on drop.
    pub fn temporary() -> Result<Self, IndexerError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, IndexerError> {
        let services = db.open_tree(SERVICES_TREE)?;
        Ok(Self { db, services })
    }

    fn key(id: u64) -> [u8; 8] {
        id.to_be_bytes()
    }
}

impl ProjectionStore for SledProjectionStore {
    fn upsert(&self, record: &ServiceRecord) -> Result<(), IndexerError> {
        let value = serde_json::to_vec(record)?;
        self.services.insert(Self::key(record.id), value)?;

        tracing::debug!(
            service_id = record.id,
            block = record.last_indexed_block,
            "Projection upserted"
        );
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<ServiceRecord>, IndexerError> {
        self.services
            .iter()
            .values()
            .map(|value| {
                let bytes = value?;
                Ok(serde_json::from_slice(&bytes)?)
            })
            .collect()
    }

    fn get(&self, id: u64) -> Result<Option<ServiceRecord>, IndexerError> {
        match self.services.get(Self::key(id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn len(&self) -> usize {
        self.services.len()
    }

    fn flush(&self) -> Result<(), IndexerError> {
        self.db.flush()?;
        Ok(())
    }
}
