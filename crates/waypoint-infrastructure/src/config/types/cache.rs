//! Cache configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use waypoint_providers::constants::{MCP_DEFAULT_ENDPOINT, REDIS_DEFAULT_URL, REDIS_SCAN_COUNT};

use crate::constants::{
    CACHE_CONNECT_TIMEOUT_MS, CACHE_DEFAULT_NAMESPACE, CACHE_OPERATION_TIMEOUT_MS,
};

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Redis URL used in `direct` mode
    pub redis_url: String,

    /// MCP wrapper endpoint used in `mcp` mode
    pub mcp_url: String,

    /// Namespace prefixed to every key
    pub namespace: String,

    /// Upper bound for each backend round trip
    pub operation_timeout_ms: u64,

    /// Upper bound for establishing the backend connection
    pub connect_timeout_ms: u64,

    /// `COUNT` hint for SCAN-based key listing
    pub key_scan_count: usize,
}

impl CacheConfig {
    /// Per-operation timeout
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    /// Connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: REDIS_DEFAULT_URL.to_string(),
            mcp_url: MCP_DEFAULT_ENDPOINT.to_string(),
            namespace: CACHE_DEFAULT_NAMESPACE.to_string(),
            operation_timeout_ms: CACHE_OPERATION_TIMEOUT_MS,
            connect_timeout_ms: CACHE_CONNECT_TIMEOUT_MS,
            key_scan_count: REDIS_SCAN_COUNT,
        }
    }
}
