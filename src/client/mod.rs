pub mod directory;

pub use directory::{DiscoveredService, DirectoryClient};
