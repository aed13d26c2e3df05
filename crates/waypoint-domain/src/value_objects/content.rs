//! Content type buckets and their default TTLs

use crate::constants::{
    TTL_DAILY_SECS, TTL_REALTIME_SECS, TTL_SEMI_STATIC_SECS, TTL_STATIC_SECS,
    TTL_TIME_SENSITIVE_SECS,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How quickly cached content goes stale
///
/// Each bucket maps to a fixed default TTL, so identical classification
/// always yields identical expiry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    /// Live data: weather, flight status, exchange rates
    Realtime,
    /// News, events, schedules
    TimeSensitive,
    /// Anything that reasonably holds for a day
    Daily,
    /// Slow-moving data: opening hours, route maps
    SemiStatic,
    /// Reference material: history, definitions
    Static,
}

impl ContentType {
    /// All buckets, shortest TTL first
    pub const ALL: [ContentType; 5] = [
        Self::Realtime,
        Self::TimeSensitive,
        Self::Daily,
        Self::SemiStatic,
        Self::Static,
    ];

    /// Default TTL in seconds
    pub fn ttl_secs(self) -> u64 {
        match self {
            Self::Realtime => TTL_REALTIME_SECS,
            Self::TimeSensitive => TTL_TIME_SENSITIVE_SECS,
            Self::Daily => TTL_DAILY_SECS,
            Self::SemiStatic => TTL_SEMI_STATIC_SECS,
            Self::Static => TTL_STATIC_SECS,
        }
    }

    /// Default TTL
    pub fn ttl(self) -> Duration {
        Duration::from_secs(self.ttl_secs())
    }

    /// Uppercase label used in logs and CLI output
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Realtime => "REALTIME",
            Self::TimeSensitive => "TIME_SENSITIVE",
            Self::Daily => "DAILY",
            Self::SemiStatic => "SEMI_STATIC",
            Self::Static => "STATIC",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
