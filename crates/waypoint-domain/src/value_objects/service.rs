//! Service registry value objects

use super::integration::IntegrationMode;
use serde::{Deserialize, Serialize};

/// Observability snapshot of one registered service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    /// Registered service name
    pub name: String,
    /// Mode the adapter would use for the next construction
    pub integration_mode: IntegrationMode,
    /// Whether an instance is currently live
    pub is_connected: bool,
    /// Adapter implementation name
    pub adapter_type: String,
}
