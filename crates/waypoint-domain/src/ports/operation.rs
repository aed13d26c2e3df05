//! Named operation port
//!
//! Operations exposed to collaborators (tool wrappers, HTTP handlers) are
//! registered by name in an explicit table at startup instead of being
//! discovered at runtime.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A named operation taking and returning JSON
#[async_trait]
pub trait Operation: Send + Sync {
    /// Registered name
    fn name(&self) -> &str;

    /// Whether results are memoized through the cache
    fn is_cached(&self) -> bool {
        false
    }

    /// Run the operation
    async fn execute(&self, params: Value) -> Result<Value>;
}
