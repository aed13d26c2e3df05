//! Configuration types module

pub mod app;
pub mod cache;
pub mod integration;
pub mod lock;
pub mod logging;

pub use app::AppConfig;
pub use cache::CacheConfig;
pub use integration::IntegrationConfig;
pub use lock::LockConfig;
pub use logging::LoggingConfig;
