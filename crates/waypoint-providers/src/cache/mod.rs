//! Cache Store Implementations
//!
//! ## Available Stores
//!
//! | Store | Type | Pipelining |
//! |-------|------|------------|
//! | [`RedisCacheStore`] | Direct SDK | One round trip |
//! | [`McpCacheStore`] | Legacy MCP wrapper | Sequential fallback |
//! | [`InMemoryCacheStore`] | Process-local | In-process |
//!
//! ## Store Selection Guide
//!
//! - **Production, `direct` mode**: `RedisCacheStore`
//! - **Production, `mcp` mode**: `McpCacheStore` against the wrapper server
//! - **Development/Testing**: `InMemoryCacheStore`

#[cfg(feature = "cache-mcp")]
pub mod mcp;
#[cfg(feature = "cache-memory")]
pub mod memory;
#[cfg(feature = "cache-redis")]
pub mod redis;

#[cfg(feature = "cache-mcp")]
pub use mcp::McpCacheStore;
#[cfg(feature = "cache-memory")]
pub use memory::InMemoryCacheStore;
#[cfg(feature = "cache-redis")]
pub use redis::RedisCacheStore;

use std::time::Duration;

/// Expiry of a write, normalized the way every store applies it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Whole seconds (`EX`)
    Seconds(u64),
    /// Milliseconds (`PX`), for TTLs that are not whole seconds
    Millis(u64),
}

impl Expiry {
    /// Normalize an optional TTL; `None` and zero mean no expiry
    pub fn from_ttl(ttl: Option<Duration>) -> Option<Self> {
        let ttl = ttl.filter(|t| !t.is_zero())?;
        let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        if millis % 1000 == 0 {
            Some(Self::Seconds(millis / 1000))
        } else {
            Some(Self::Millis(millis))
        }
    }

    /// Expiry as a duration
    pub fn as_duration(self) -> Duration {
        match self {
            Self::Seconds(secs) => Duration::from_secs(secs),
            Self::Millis(millis) => Duration::from_millis(millis),
        }
    }
}
