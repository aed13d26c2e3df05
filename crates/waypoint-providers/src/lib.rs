//! # Waypoint - Cache Store Implementations
//!
//! Each store implements the `CacheStore` port defined in `waypoint-domain`.
//!
//! | Store | Strategy | Description |
//! |-------|----------|-------------|
//! | [`cache::RedisCacheStore`] | Direct | `redis` client over a managed multiplexed connection |
//! | [`cache::McpCacheStore`] | MCP | Tool calls on an MCP server that wraps the store |
//! | [`cache::InMemoryCacheStore`] | Local | Process-local store for development and tests |
//!
//! ## Feature Flags
//!
//! ```toml
//! [dependencies]
//! waypoint-providers = { version = "0.1", default-features = false, features = ["cache-redis"] }
//! ```

// Re-export waypoint-domain types commonly used with stores
pub use waypoint_domain::error::{Error, Result};
pub use waypoint_domain::ports::CacheStore;

/// Provider-specific constants
pub mod constants;

/// Cache store implementations
///
/// Implements `CacheStore` for each supported backend.
pub mod cache;
