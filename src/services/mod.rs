pub mod ethereum;
pub mod reconciler;
pub mod registry;
pub mod stats;
pub mod store;

pub use ethereum::{ChainLogReader, EthereumService};
pub use reconciler::{PassOutcome, PassReport, Reconciler, ReconcilerSettings, ReconcilerState};
pub use registry::{RegistryReader, ServiceDetailFetcher};
pub use stats::IndexerStats;
pub use store::{ProjectionStore, SledProjectionStore};
