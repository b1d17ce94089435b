pub mod health;
pub mod services;
pub mod stats;

pub use health::*;
pub use services::*;
pub use stats::*;
