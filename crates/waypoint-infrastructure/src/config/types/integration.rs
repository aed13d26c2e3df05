//! Integration mode defaults

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use waypoint_domain::value_objects::IntegrationMode;

/// Modes used when no `FEATURE_<SERVICE>_INTEGRATION` variable is set
///
/// ```toml
/// [integrations]
/// default_mode = "direct"
///
/// [integrations.services]
/// cache = "mcp"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationConfig {
    /// Mode for services without an explicit entry
    pub default_mode: IntegrationMode,

    /// Per-service modes
    pub services: BTreeMap<String, IntegrationMode>,
}

impl IntegrationConfig {
    /// Configured mode for `service`
    pub fn mode_for(&self, service: &str) -> IntegrationMode {
        self.services
            .get(service)
            .copied()
            .unwrap_or(self.default_mode)
    }
}
