pub mod event;
pub mod response;
pub mod service;

pub use event::*;
pub use response::*;
pub use service::*;
