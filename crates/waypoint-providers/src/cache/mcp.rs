//! MCP cache store
//!
//! Legacy-mode store that reaches the cache through an MCP server wrapping
//! Redis. Every store method becomes one `tools/call` JSON-RPC request.
//!
//! ## Tool contract
//!
//! | Tool | Arguments | Result |
//! |------|-----------|--------|
//! | `ping` | none | any |
//! | `get`, `ttl`, `rpop`, `llen`, `hgetall`, `smembers` | `key` | string or null, int, object, array |
//! | `set` | `key`, `value`, `ttl_ms?`, `condition?` (`"nx"`/`"xx"`) | bool |
//! | `delete`, `exists` | `keys` | int |
//! | `expire` | `key`, `ttl_ms` | bool |
//! | `hget`, `hset`, `hdel` | `key`, `field`/`fields`, `value?` | string or null, bool, int |
//! | `lpush` | `key`, `values` | int |
//! | `sadd`, `sismember` | `key`, `members`/`member` | int, bool |
//! | `scan` | `pattern` | array of keys |
//! | `eval` | `script`, `keys`, `args` | int |
//! | `info` | none | `{keys, used_memory_bytes?}` |
//!
//! Results come back as the first text content item, holding JSON.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use waypoint_domain::error::{Error, Result};
use waypoint_domain::ports::CacheStore;
use waypoint_domain::value_objects::{SetCondition, StoreInfo};

use super::Expiry;
use crate::constants::{
    MCP_CLIENT_NAME, MCP_PROTOCOL_VERSION, MCP_SESSION_HEADER, REDIS_RELEASE_SCRIPT,
};

/// JSON-RPC request envelope
#[derive(Debug, Serialize)]
struct McpRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    params: Value,
}

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct McpResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<McpError>,
}

/// JSON-RPC error object
#[derive(Debug, Deserialize)]
struct McpError {
    code: i64,
    message: String,
}

/// `tools/call` result
#[derive(Debug, Deserialize)]
struct ToolResult {
    #[serde(default)]
    content: Vec<ToolContent>,
    #[serde(rename = "isError", default)]
    is_error: bool,
}

#[derive(Debug, Deserialize)]
struct ToolContent {
    #[serde(default)]
    text: Option<String>,
}

/// MCP cache store
///
/// Talks JSON-RPC 2.0 over HTTP. No pipelining: batches fall back to the
/// sequential default of the `CacheStore` port.
pub struct McpCacheStore {
    endpoint: String,
    client: reqwest::Client,
    session_id: RwLock<Option<String>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl McpCacheStore {
    /// Create a store for an MCP endpoint without contacting it
    ///
    /// # Arguments
    ///
    /// * `endpoint` - URL of the MCP server (e.g., "http://127.0.0.1:8000/mcp")
    /// * `timeout` - Per-request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let endpoint = endpoint.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::connect_with_source("mcp", "Failed to create HTTP client", e))?;

        Ok(Self {
            endpoint,
            client,
            session_id: RwLock::new(None),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        })
    }

    /// Perform the MCP initialize handshake
    pub async fn connect(&self) -> Result<()> {
        let params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": MCP_CLIENT_NAME, "version": env!("CARGO_PKG_VERSION") },
        });
        let result = self.request("initialize", params).await.map_err(|e| {
            let message = format!("{} initialize failed", self.endpoint);
            Error::connect_with_source("mcp", message, e)
        })?;

        if let Some(server) = result.pointer("/serverInfo/name").and_then(Value::as_str) {
            tracing::debug!(server = %server, endpoint = %self.endpoint, "MCP session initialized");
        }

        self.notify("notifications/initialized").await.map_err(|e| {
            let message = format!("{} initialized notification failed", self.endpoint);
            Error::connect_with_source("mcp", message, e)
        })?;
        self.closed.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Open and handshake in one step
    pub async fn open(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let store = Self::new(endpoint, timeout)?;
        store.connect().await?;
        Ok(store)
    }

    /// Endpoint this store talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::connection("MCP cache session is closed"));
        }
        Ok(())
    }

    fn session(&self) -> Option<String> {
        self.session_id.read().ok().and_then(|s| s.clone())
    }

    async fn post(&self, body: &McpRequest<'_>) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json, text/event-stream")
            .json(body);
        if let Some(session) = self.session() {
            request = request.header(MCP_SESSION_HEADER, session);
        }

        let response = request.send().await.map_err(|e| {
            Error::connection_with_source(format!("MCP {} request failed: {e}", body.method), e)
        })?;

        if let Some(session) = response
            .headers()
            .get(MCP_SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            && let Ok(mut slot) = self.session_id.write()
        {
            *slot = Some(session.to_string());
        }

        let status = response.status();
        if !status.is_success() {
            return Err(Error::connection(format!(
                "MCP {} returned HTTP {status}",
                body.method
            )));
        }
        Ok(response)
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = McpRequest {
            jsonrpc: "2.0",
            id: Some(id),
            method,
            params,
        };
        tracing::trace!(method = %method, id, "MCP request");

        let response = self.post(&body).await?;
        let text = response.text().await.map_err(|e| {
            Error::connection_with_source(format!("MCP {method} response unreadable: {e}"), e)
        })?;

        let envelope: McpResponse = serde_json::from_str(response_payload(&text))?;
        if let Some(error) = envelope.error {
            return Err(Error::cache_operation(format!(
                "MCP {method} error {}: {}",
                error.code, error.message
            )));
        }
        envelope
            .result
            .ok_or_else(|| Error::cache_operation(format!("MCP {method} returned no result")))
    }

    async fn notify(&self, method: &str) -> Result<()> {
        let body = McpRequest {
            jsonrpc: "2.0",
            id: None,
            method,
            params: json!({}),
        };
        self.post(&body).await.map(|_| ())
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value> {
        self.ensure_open()?;
        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        let result: ToolResult = serde_json::from_value(result)?;

        let text = result
            .content
            .into_iter()
            .find_map(|item| item.text)
            .unwrap_or_default();
        if result.is_error {
            return Err(Error::cache_operation(format!("MCP tool '{name}' failed: {text}")));
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        // non-JSON text is passed through as a plain string
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

impl std::fmt::Debug for McpCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpCacheStore")
            .field("endpoint", &self.endpoint)
            .field("has_session", &self.session().is_some())
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl CacheStore for McpCacheStore {
    async fn ping(&self) -> Result<()> {
        self.call_tool("ping", json!({})).await.map(|_| ())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(as_opt_string(self.call_tool("get", json!({ "key": key })).await?))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
        condition: SetCondition,
    ) -> Result<bool> {
        let mut arguments = json!({ "key": key, "value": value });
        if let Some(expiry) = Expiry::from_ttl(ttl) {
            arguments["ttl_ms"] = json!(ttl_millis(expiry.as_duration()));
        }
        if let Some(flag) = condition.as_redis_arg() {
            arguments["condition"] = json!(flag.to_ascii_lowercase());
        }
        as_bool("set", self.call_tool("set", arguments).await?)
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        as_u64("delete", self.call_tool("delete", json!({ "keys": keys })).await?)
    }

    async fn exists(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        as_u64("exists", self.call_tool("exists", json!({ "keys": keys })).await?)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let arguments = json!({ "key": key, "ttl_ms": ttl_millis(ttl) });
        as_bool("expire", self.call_tool("expire", arguments).await?)
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        as_i64("ttl", self.call_tool("ttl", json!({ "key": key })).await?)
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let arguments = json!({ "key": key, "field": field });
        Ok(as_opt_string(self.call_tool("hget", arguments).await?))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let arguments = json!({ "key": key, "field": field, "value": value });
        as_bool("hset", self.call_tool("hset", arguments).await?)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        match self.call_tool("hgetall", json!({ "key": key })).await? {
            Value::Null => Ok(HashMap::new()),
            Value::Object(map) => map
                .into_iter()
                .map(|(field, value)| Ok((field, required_string("hgetall", value)?)))
                .collect(),
            other => Err(unexpected("hgetall", &other)),
        }
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let arguments = json!({ "key": key, "fields": fields });
        as_u64("hdel", self.call_tool("hdel", arguments).await?)
    }

    async fn lpush(&self, key: &str, values: &[String]) -> Result<u64> {
        if values.is_empty() {
            return self.llen(key).await;
        }
        let arguments = json!({ "key": key, "values": values });
        as_u64("lpush", self.call_tool("lpush", arguments).await?)
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>> {
        Ok(as_opt_string(self.call_tool("rpop", json!({ "key": key })).await?))
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        as_u64("llen", self.call_tool("llen", json!({ "key": key })).await?)
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        let arguments = json!({ "key": key, "members": members });
        as_u64("sadd", self.call_tool("sadd", arguments).await?)
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        as_strings("smembers", self.call_tool("smembers", json!({ "key": key })).await?)
            .map(|members| members.into_iter().collect())
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        let arguments = json!({ "key": key, "member": member });
        as_bool("sismember", self.call_tool("sismember", arguments).await?)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let found = self.call_tool("scan", json!({ "pattern": pattern })).await?;
        let mut keys = as_strings("scan", found)?;
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool> {
        let arguments = json!({
            "script": REDIS_RELEASE_SCRIPT,
            "keys": [key],
            "args": [expected],
        });
        Ok(as_i64("eval", self.call_tool("eval", arguments).await?)? == 1)
    }

    async fn info(&self) -> Result<StoreInfo> {
        let info = self.call_tool("info", json!({})).await?;
        Ok(StoreInfo {
            keys: info.get("keys").and_then(Value::as_u64).unwrap_or(0),
            used_memory_bytes: info.get("used_memory_bytes").and_then(Value::as_u64),
        })
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Ok(mut slot) = self.session_id.write() {
            slot.take();
        }
        tracing::debug!(endpoint = %self.endpoint, "MCP cache session closed");
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "mcp"
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Unwrap an SSE-framed body to its last `data:` payload
fn response_payload(body: &str) -> &str {
    let trimmed = body.trim_start();
    if trimmed.starts_with('{') {
        return trimmed;
    }
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|data| !data.is_empty())
        .last()
        .unwrap_or(trimmed)
}

fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}

fn unexpected(tool: &str, value: &Value) -> Error {
    Error::cache_operation(format!("Unexpected result from MCP tool '{tool}': {value}"))
}

fn as_opt_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        // a wrapper may decode JSON-looking values; re-encode them verbatim
        other => Some(other.to_string()),
    }
}

fn required_string(tool: &str, value: Value) -> Result<String> {
    as_opt_string(value)
        .ok_or_else(|| Error::cache_operation(format!("Null element from MCP tool '{tool}'")))
}

fn as_bool(tool: &str, value: Value) -> Result<bool> {
    match value {
        Value::Bool(flag) => Ok(flag),
        Value::Number(n) => Ok(n.as_i64().is_some_and(|n| n > 0)),
        Value::String(ref s) if s.eq_ignore_ascii_case("ok") => Ok(true),
        Value::Null => Ok(false),
        other => Err(unexpected(tool, &other)),
    }
}

fn as_i64(tool: &str, value: Value) -> Result<i64> {
    match &value {
        Value::Number(n) => n.as_i64().ok_or_else(|| unexpected(tool, &value)),
        Value::String(s) => s.trim().parse().map_err(|_| unexpected(tool, &value)),
        _ => Err(unexpected(tool, &value)),
    }
}

fn as_u64(tool: &str, value: Value) -> Result<u64> {
    let n = as_i64(tool, value)?;
    Ok(u64::try_from(n).unwrap_or(0))
}

fn as_strings(tool: &str, value: Value) -> Result<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| required_string(tool, item))
            .collect(),
        other => Err(unexpected(tool, &other)),
    }
}
