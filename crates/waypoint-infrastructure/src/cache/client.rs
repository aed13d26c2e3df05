//! Cache client facade
//!
//! [`CacheClient`] sits between callers and a [`CacheStore`]. It namespaces
//! keys, bounds every round trip with a timeout, serializes JSON values and
//! keeps hit/miss counters.
//!
//! Scalar reads and writes absorb backend failures: a failed read is a miss,
//! a failed write is `false`, and both are logged. The cache is an
//! optimization, so a caller's hot path never sees a cache error. Collection
//! operations, pipelines and `ping` return `Result`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use waypoint_domain::error::{Error, Result};
use waypoint_domain::keys;
use waypoint_domain::ports::{CacheStore, ManagedService, StoreReply};
use waypoint_domain::value_objects::{CacheStats, SetCondition};

use super::pipeline::Pipeline;
use crate::config::{CacheConfig, LockConfig};

/// Options for a single `SET`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Expiry; `None` or zero stores without expiry
    pub ttl: Option<Duration>,
    /// `NX` / `XX` condition
    pub condition: SetCondition,
}

impl SetOptions {
    /// Unconditional write expiring after `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            condition: SetCondition::Always,
        }
    }

    /// Only write if the key is absent (`NX`)
    #[must_use]
    pub fn if_absent(mut self) -> Self {
        self.condition = SetCondition::IfAbsent;
        self
    }

    /// Only write if the key exists (`XX`)
    #[must_use]
    pub fn if_present(mut self) -> Self {
        self.condition = SetCondition::IfPresent;
        self
    }
}

/// Namespaced, timeout-bounded cache client
///
/// One instance owns the store connection for a service name; every caller
/// of that service shares it.
pub struct CacheClient {
    store: Arc<dyn CacheStore>,
    namespace: String,
    operation_timeout: Duration,
    lock: LockConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

impl CacheClient {
    /// Wrap a connected store
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig, lock: &LockConfig) -> Self {
        Self {
            store,
            namespace: config.namespace.clone(),
            operation_timeout: config.operation_timeout(),
            lock: lock.clone(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Wrap a store with default configuration
    pub fn with_store(store: Arc<dyn CacheStore>) -> Self {
        Self::new(store, &CacheConfig::default(), &LockConfig::default())
    }

    /// Underlying store, for raw access that propagates every error
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Key namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Lock defaults used by `with_lock`
    pub fn lock_config(&self) -> &LockConfig {
        &self.lock
    }

    /// Per-operation timeout
    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    /// Namespaced form of `key`
    pub fn key(&self, key: &str) -> String {
        keys::namespaced(&self.namespace, key)
    }

    fn keys_of(&self, keys: &[&str]) -> Vec<String> {
        keys.iter().map(|key| self.key(key)).collect()
    }

    /// Run a store future under the operation timeout
    pub(crate) async fn timed<T>(
        &self,
        operation: &str,
        future: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        bounded(self.operation_timeout, operation, future).await
    }

    /// Log and count an absorbed failure
    pub(crate) fn absorb(&self, operation: &str, key: &str, error: &Error) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        warn!(operation = %operation, key = %key, error = %error, "Cache operation failed");
    }

    fn record_lookup(&self, found: bool) {
        if found {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    // ========================================================================
    // Health
    // ========================================================================

    /// Round-trip health check
    pub async fn ping(&self) -> Result<()> {
        self.timed("ping", self.store.ping()).await
    }

    // ========================================================================
    // Scalar KV (failures absorbed)
    // ========================================================================

    /// Get a string value; `None` on a miss or a backend failure
    pub async fn get(&self, key: &str) -> Option<String> {
        let key = self.key(key);
        match self.timed("get", self.store.get(&key)).await {
            Ok(value) => {
                self.record_lookup(value.is_some());
                value
            }
            Err(e) => {
                self.absorb("get", &key, &e);
                self.record_lookup(false);
                None
            }
        }
    }

    /// Unconditional write; `None` or zero `ttl` never expires
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> bool {
        self.set_with(
            key,
            value,
            SetOptions {
                ttl,
                condition: SetCondition::Always,
            },
        )
        .await
    }

    /// Write with options; `false` when the condition blocked it or it failed
    pub async fn set_with(&self, key: &str, value: &str, options: SetOptions) -> bool {
        let key = self.key(key);
        let write = self
            .store
            .set(&key, value, options.ttl, options.condition);
        match self.timed("set", write).await {
            Ok(written) => written,
            Err(e) => {
                self.absorb("set", &key, &e);
                false
            }
        }
    }

    /// Delete keys, returning how many existed (0 on failure)
    pub async fn delete(&self, keys: &[&str]) -> u64 {
        let keys = self.keys_of(keys);
        match self.timed("delete", self.store.delete(&keys)).await {
            Ok(count) => count,
            Err(e) => {
                self.absorb("delete", &keys.join(","), &e);
                0
            }
        }
    }

    /// Count existing keys (0 on failure)
    pub async fn exists(&self, keys: &[&str]) -> u64 {
        let keys = self.keys_of(keys);
        match self.timed("exists", self.store.exists(&keys)).await {
            Ok(count) => count,
            Err(e) => {
                self.absorb("exists", &keys.join(","), &e);
                0
            }
        }
    }

    /// Set a key's expiry; `false` if absent or on failure
    pub async fn expire(&self, key: &str, ttl: Duration) -> bool {
        let key = self.key(key);
        match self.timed("expire", self.store.expire(&key, ttl)).await {
            Ok(updated) => updated,
            Err(e) => {
                self.absorb("expire", &key, &e);
                false
            }
        }
    }

    /// Remaining TTL in seconds; `-1` without expiry, `-2` when absent or on failure
    pub async fn ttl(&self, key: &str) -> i64 {
        let key = self.key(key);
        match self.timed("ttl", self.store.ttl(&key)).await {
            Ok(ttl) => ttl,
            Err(e) => {
                self.absorb("ttl", &key, &e);
                waypoint_domain::constants::TTL_KEY_ABSENT
            }
        }
    }

    // ========================================================================
    // JSON
    // ========================================================================

    /// Get and deserialize a JSON value
    ///
    /// A blob that does not parse as `T` is logged and treated as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %self.key(key), error = %e, "Discarding malformed cached JSON");
                // the lookup counted as a hit; the caller sees a miss
                self.hits.fetch_sub(1, Ordering::Relaxed);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Serialize and store a JSON value
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> bool {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw, ttl).await,
            Err(e) => {
                self.absorb("set_json", &self.key(key), &Error::from(e));
                false
            }
        }
    }

    // ========================================================================
    // Collections (errors propagate; absent keys are empty results)
    // ========================================================================

    /// Get one hash field
    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let key = self.key(key);
        self.timed("hget", self.store.hget(&key, field)).await
    }

    /// Set one hash field, `true` if it is new
    pub async fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let key = self.key(key);
        self.timed("hset", self.store.hset(&key, field, value)).await
    }

    /// Every field of a hash
    pub async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        let key = self.key(key);
        self.timed("hgetall", self.store.hgetall(&key)).await
    }

    /// Delete hash fields, returning how many existed
    pub async fn hdel(&self, key: &str, fields: &[&str]) -> Result<u64> {
        let key = self.key(key);
        let fields: Vec<String> = fields.iter().map(ToString::to_string).collect();
        self.timed("hdel", self.store.hdel(&key, &fields)).await
    }

    /// Push to the head of a list, returning its new length
    pub async fn lpush(&self, key: &str, values: &[&str]) -> Result<u64> {
        let key = self.key(key);
        let values: Vec<String> = values.iter().map(ToString::to_string).collect();
        self.timed("lpush", self.store.lpush(&key, &values)).await
    }

    /// Pop from the tail of a list
    pub async fn rpop(&self, key: &str) -> Result<Option<String>> {
        let key = self.key(key);
        self.timed("rpop", self.store.rpop(&key)).await
    }

    /// Length of a list
    pub async fn llen(&self, key: &str) -> Result<u64> {
        let key = self.key(key);
        self.timed("llen", self.store.llen(&key)).await
    }

    /// Add set members, returning how many were new
    pub async fn sadd(&self, key: &str, members: &[&str]) -> Result<u64> {
        let key = self.key(key);
        let members: Vec<String> = members.iter().map(ToString::to_string).collect();
        self.timed("sadd", self.store.sadd(&key, &members)).await
    }

    /// Members of a set
    pub async fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        let key = self.key(key);
        self.timed("smembers", self.store.smembers(&key)).await
    }

    /// Set membership test
    pub async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        let key = self.key(key);
        self.timed("sismember", self.store.sismember(&key, member)).await
    }

    // ========================================================================
    // Pipelines and batches
    // ========================================================================

    /// Start a pipeline; nothing is sent until `execute`
    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(self)
    }

    /// Build and execute a pipeline in one scope
    ///
    /// ```ignore
    /// let replies = cache
    ///     .pipelined(|p| {
    ///         p.set("a", "1", None).set("b", "2", None).get("a");
    ///     })
    ///     .await?;
    /// ```
    pub async fn pipelined<F>(&self, build: F) -> Result<Vec<StoreReply>>
    where
        F: FnOnce(&mut Pipeline<'_>),
    {
        let mut pipeline = self.pipeline();
        build(&mut pipeline);
        pipeline.execute().await
    }

    /// Get many keys, returning only those found, keyed as requested
    ///
    /// One round trip on pipelining stores, a loop otherwise. A failure is
    /// logged and returns an empty map.
    pub async fn batch_get(&self, keys: &[&str]) -> HashMap<String, String> {
        if keys.is_empty() {
            return HashMap::new();
        }

        let fetched: Result<Vec<Option<String>>> = if self.store.supports_pipeline() {
            let mut pipeline = self.pipeline();
            for key in keys {
                pipeline.get(key);
            }
            pipeline.execute().await.map(|replies| {
                replies
                    .into_iter()
                    .map(|reply| match reply {
                        StoreReply::Value(value) => value,
                        _ => None,
                    })
                    .collect()
            })
        } else {
            let mut values = Vec::with_capacity(keys.len());
            let mut outcome = Ok(());
            for key in keys {
                let key = self.key(key);
                match self.timed("get", self.store.get(&key)).await {
                    Ok(value) => values.push(value),
                    Err(e) => {
                        outcome = Err(e);
                        break;
                    }
                }
            }
            outcome.map(|()| values)
        };

        match fetched {
            Ok(values) => {
                let mut found = HashMap::with_capacity(keys.len());
                for (key, value) in keys.iter().zip(values) {
                    self.record_lookup(value.is_some());
                    if let Some(value) = value {
                        found.insert((*key).to_string(), value);
                    }
                }
                found
            }
            Err(e) => {
                self.absorb("batch_get", &keys.join(","), &e);
                HashMap::new()
            }
        }
    }

    /// Set many keys with one TTL; `true` if every write succeeded
    pub async fn batch_set(&self, entries: &[(&str, &str)], ttl: Option<Duration>) -> bool {
        if entries.is_empty() {
            return true;
        }

        let written: Result<bool> = if self.store.supports_pipeline() {
            let mut pipeline = self.pipeline();
            for (key, value) in entries {
                pipeline.set(key, value, ttl);
            }
            pipeline
                .execute()
                .await
                .map(|replies| replies.iter().all(|r| *r == StoreReply::Bool(true)))
        } else {
            let mut all = Ok(true);
            for (key, value) in entries {
                let key = self.key(key);
                let write = self.store.set(&key, value, ttl, SetCondition::Always);
                match self.timed("set", write).await {
                    Ok(ok) => {
                        all = all.map(|acc| acc && ok);
                    }
                    Err(e) => {
                        all = Err(e);
                        break;
                    }
                }
            }
            all
        };

        written.unwrap_or_else(|e| {
            self.absorb("batch_set", &format!("{} keys", entries.len()), &e);
            false
        })
    }

    // ========================================================================
    // Pattern operations
    // ========================================================================

    /// Keys matching a glob pattern within the namespace
    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = self.key(pattern);
        self.timed("keys", self.store.keys(&pattern)).await
    }

    /// Delete every key matching a glob pattern, returning the count
    pub async fn clear_pattern(&self, pattern: &str) -> Result<u64> {
        let matched = self.keys(pattern).await?;
        if matched.is_empty() {
            return Ok(0);
        }
        let deleted = self.timed("delete", self.store.delete(&matched)).await?;
        debug!(pattern = %pattern, deleted, "Cleared cache keys");
        Ok(deleted)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Counters plus best-effort key count and memory from the backend
    pub async fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            ..CacheStats::default()
        };
        stats.hit_rate = stats.calculate_hit_rate();

        match self.timed("info", self.store.info()).await {
            Ok(info) => {
                stats.entries = info.keys;
                stats.bytes_used = info.used_memory_bytes;
            }
            Err(e) => {
                debug!(error = %e, "Backend statistics unavailable");
            }
        }
        stats
    }
}

/// Bound `future` by `timeout`, mapping an elapsed timer to a connection error
pub(crate) async fn bounded<T>(
    timeout: Duration,
    operation: &str,
    future: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(Error::connection(format!(
            "Cache {operation} timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}

impl fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheClient")
            .field("backend", &self.store.backend_name())
            .field("namespace", &self.namespace)
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ManagedService for CacheClient {
    async fn connect(&self) -> Result<()> {
        self.ping().await
    }

    async fn close(&self) -> Result<()> {
        self.store.close().await
    }

    fn implementation(&self) -> String {
        self.store.backend_name().to_string()
    }
}
