//! Provider Constants
//!
//! Constants specific to store implementations. Domain constants live in
//! `waypoint-domain`, tunables in `waypoint-infrastructure`.

// ============================================================================
// REDIS CONSTANTS
// ============================================================================

/// Default Redis URL
pub const REDIS_DEFAULT_URL: &str = "redis://localhost:6379";

/// `COUNT` hint per `SCAN` iteration
pub const REDIS_SCAN_COUNT: usize = 500;

/// Atomic compare-and-delete used to release locks
pub const REDIS_RELEASE_SCRIPT: &str = r#"if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end"#;

/// `INFO memory` field carrying used bytes
pub const REDIS_USED_MEMORY_FIELD: &str = "used_memory:";

// ============================================================================
// MCP CONSTANTS
// ============================================================================

/// Default MCP endpoint of the cache wrapper server
pub const MCP_DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/mcp";

/// MCP protocol revision sent on initialize
pub const MCP_PROTOCOL_VERSION: &str = "2025-03-26";

/// Session header for streamable HTTP transports
pub const MCP_SESSION_HEADER: &str = "mcp-session-id";

/// Client name announced on initialize
pub const MCP_CLIENT_NAME: &str = "waypoint";

// ============================================================================
// IN-MEMORY CONSTANTS
// ============================================================================

/// Backend name of the in-memory store
pub const MEMORY_BACKEND_NAME: &str = "memory";

/// Error message for type mismatches, matching Redis
pub const WRONGTYPE_MESSAGE: &str =
    "WRONGTYPE Operation against a key holding the wrong kind of value";
