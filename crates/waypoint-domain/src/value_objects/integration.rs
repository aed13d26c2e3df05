//! Integration mode value objects

use crate::constants::{INTEGRATION_ENV_PREFIX, INTEGRATION_ENV_SUFFIX};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire strategy used to reach a backend service
///
/// - `Mcp`: legacy strategy, every command is a tool call on an MCP server
///   that wraps the backend
/// - `Direct`: the backend's own client library talks to it directly
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationMode {
    /// Legacy RPC-wrapper strategy
    Mcp,
    /// Direct-SDK strategy
    #[default]
    Direct,
}

impl IntegrationMode {
    /// Lowercase wire name (`mcp` / `direct`)
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mcp => "mcp",
            Self::Direct => "direct",
        }
    }

    /// Check if this is the direct-SDK strategy
    pub fn is_direct(self) -> bool {
        self == Self::Direct
    }
}

impl fmt::Display for IntegrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mcp" => Ok(Self::Mcp),
            "direct" => Ok(Self::Direct),
            other => Err(Error::invalid_argument(format!(
                "Invalid integration mode '{other}'. Use 'mcp' or 'direct'"
            ))),
        }
    }
}

/// Name of the environment variable that selects a service's mode
///
/// `weather-api` becomes `FEATURE_WEATHER_API_INTEGRATION`.
pub fn integration_env_var(service: &str) -> String {
    let normalized: String = service
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{INTEGRATION_ENV_PREFIX}{normalized}{INTEGRATION_ENV_SUFFIX}")
}
