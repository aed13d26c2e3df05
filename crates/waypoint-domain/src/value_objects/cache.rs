//! Cache value objects

use serde::{Deserialize, Serialize};

/// Condition attached to a `SET`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SetCondition {
    /// Unconditional write
    #[default]
    Always,
    /// Only write if the key is absent (`NX`)
    IfAbsent,
    /// Only write if the key already exists (`XX`)
    IfPresent,
}

impl SetCondition {
    /// Redis argument for the condition, if any
    pub fn as_redis_arg(self) -> Option<&'static str> {
        match self {
            Self::Always => None,
            Self::IfAbsent => Some("NX"),
            Self::IfPresent => Some("XX"),
        }
    }
}

/// Proof of a held distributed lock
///
/// Only the holder of the matching `token` may release `key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockToken {
    /// Store key holding the lock (already derived and namespaced)
    pub key: String,
    /// Unique token for this lock acquisition
    pub token: String,
}

/// Raw numbers a backend reports about itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    /// Number of keys in the selected database
    pub keys: u64,
    /// Bytes of memory the backend reports in use, when it reports any
    pub used_memory_bytes: Option<u64>,
}

/// Cache Operation Statistics
///
/// Tracks cache performance metrics including hits, misses, and hit rate.
/// `bytes_used` is best-effort: it is whatever the backend reports, and
/// `None` when the backend reports nothing or could not be reached.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of absorbed backend errors
    pub errors: u64,
    /// Number of cache entries
    pub entries: u64,
    /// Cache hit rate (0.0 to 1.0)
    pub hit_rate: f64,
    /// Total bytes used by cache, when the backend reports it
    pub bytes_used: Option<u64>,
}

impl CacheStats {
    /// Create empty cache statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Calculate hit rate from hits and misses
    #[allow(clippy::cast_precision_loss)]
    pub fn calculate_hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}
