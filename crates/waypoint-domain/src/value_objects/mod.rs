//! Value objects shared across layers

pub mod cache;
pub mod content;
pub mod integration;
pub mod service;

pub use cache::{CacheStats, LockToken, SetCondition, StoreInfo};
pub use content::ContentType;
pub use integration::{IntegrationMode, integration_env_var};
pub use service::ServiceStatus;
