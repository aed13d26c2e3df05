//! Domain constants
//!
//! Values that are part of the domain contract: TTL buckets, key layout and
//! environment variable naming. Infrastructure tunables live in
//! `waypoint_infrastructure::constants`.

// ============================================================================
// CONTENT TTL CONSTANTS
// ============================================================================

/// TTL for realtime content (1 minute)
pub const TTL_REALTIME_SECS: u64 = 60;

/// TTL for time-sensitive content (15 minutes)
pub const TTL_TIME_SENSITIVE_SECS: u64 = 900;

/// TTL for content that changes daily (24 hours)
pub const TTL_DAILY_SECS: u64 = 86_400;

/// TTL for semi-static content (7 days)
pub const TTL_SEMI_STATIC_SECS: u64 = 7 * 86_400;

/// TTL for static reference content (30 days)
pub const TTL_STATIC_SECS: u64 = 30 * 86_400;

// ============================================================================
// KEY LAYOUT CONSTANTS
// ============================================================================

/// Separator between a namespace and the rest of a key
pub const KEY_SEPARATOR: &str = ":";

/// Prefix of the derived key holding a distributed lock
pub const LOCK_KEY_PREFIX: &str = "lock";

/// `TTL` reply for a key that exists without expiry
pub const TTL_NO_EXPIRY: i64 = -1;

/// `TTL` reply for a key that does not exist
pub const TTL_KEY_ABSENT: i64 = -2;

// ============================================================================
// INTEGRATION CONSTANTS
// ============================================================================

/// Prefix of per-service integration mode variables
pub const INTEGRATION_ENV_PREFIX: &str = "FEATURE_";

/// Suffix of per-service integration mode variables
pub const INTEGRATION_ENV_SUFFIX: &str = "_INTEGRATION";

/// Registry name of the distributed cache service
pub const CACHE_SERVICE_NAME: &str = "cache";
