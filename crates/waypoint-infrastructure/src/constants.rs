//! Infrastructure layer constants
//!
//! Contains constants that are part of the infrastructure implementation.
//! Domain constants (TTL buckets, key layout) live in `waypoint_domain::constants`.

// ============================================================================
// CONFIGURATION CONSTANTS
// ============================================================================

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "waypoint.toml";

/// Default configuration directory name
pub const DEFAULT_CONFIG_DIR: &str = "waypoint";

/// Environment variable prefix for configuration
pub const CONFIG_ENV_PREFIX: &str = "WAYPOINT";

/// Environment variable overriding the log filter
pub const LOG_FILTER_ENV: &str = "WAYPOINT_LOG";

// ============================================================================
// CACHE CONSTANTS
// ============================================================================

/// Default cache key namespace
pub const CACHE_DEFAULT_NAMESPACE: &str = "waypoint";

/// Per-operation timeout in milliseconds
pub const CACHE_OPERATION_TIMEOUT_MS: u64 = 2_000;

/// Timeout for establishing a backend connection in milliseconds
pub const CACHE_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// Accepted Redis URL schemes
pub const REDIS_URL_SCHEMES: &[&str] = &["redis://", "rediss://", "redis+unix://", "unix://"];

// ============================================================================
// LOCK CONSTANTS
// ============================================================================

/// Lock TTL in seconds
pub const LOCK_DEFAULT_TTL_SECS: u64 = 30;

/// Delay between acquisition attempts in milliseconds
pub const LOCK_DEFAULT_RETRY_DELAY_MS: u64 = 100;

/// Acquisition retries after the first attempt
pub const LOCK_DEFAULT_RETRY_COUNT: u32 = 10;

// ============================================================================
// LOGGING CONSTANTS
// ============================================================================

/// Default log level
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Fallback log file stem
pub const DEFAULT_LOG_FILE_STEM: &str = "waypoint";

// ============================================================================
// ADAPTER CONSTANTS
// ============================================================================

/// Adapter type reported for the cache service
pub const CACHE_ADAPTER_TYPE: &str = "CacheServiceAdapter";
