//! Application configuration root

use serde::{Deserialize, Serialize};

use super::{CacheConfig, IntegrationConfig, LockConfig, LoggingConfig};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cache backends and client behavior
    pub cache: CacheConfig,

    /// Distributed lock defaults
    pub lock: LockConfig,

    /// Per-service integration mode defaults
    pub integrations: IntegrationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}
