pub mod analysis;
pub mod audit;
pub mod cache;
pub mod config;
pub mod error;
pub mod identity;
pub mod notifications;
pub mod services;
pub mod store;
pub mod telemetry;

pub use config::CoreConfig;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use services::CoreServices;
