//! Distributed lock configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    LOCK_DEFAULT_RETRY_COUNT, LOCK_DEFAULT_RETRY_DELAY_MS, LOCK_DEFAULT_TTL_SECS,
};

/// Lock defaults used by `CacheClient::with_lock`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Safety expiry of a held lock
    pub ttl_secs: u64,

    /// Delay between acquisition attempts
    pub retry_delay_ms: u64,

    /// Attempts after the first one before giving up
    pub retry_count: u32,
}

impl LockConfig {
    /// Lock TTL
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Retry delay
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            ttl_secs: LOCK_DEFAULT_TTL_SECS,
            retry_delay_ms: LOCK_DEFAULT_RETRY_DELAY_MS,
            retry_count: LOCK_DEFAULT_RETRY_COUNT,
        }
    }
}
