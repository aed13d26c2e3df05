//! Redis cache store
//!
//! Direct-mode store talking to Redis through the `redis` crate.
//!
//! ## Features
//!
//! - Auto-reconnecting multiplexed connection (`ConnectionManager`)
//! - `SET` with `EX`/`PX` and `NX`/`XX`
//! - Real pipelining: one round trip per batch
//! - Lock release as a server-side Lua compare-and-delete
//! - Cursor-based `SCAN` for pattern matching
//!
//! ## Example
//!
//! ```ignore
//! use waypoint_providers::cache::RedisCacheStore;
//!
//! let store = RedisCacheStore::new("redis://localhost:6379")?;
//! store.connect(Duration::from_secs(5)).await?;
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Cmd, FromRedisValue, RedisError, Value};
use waypoint_domain::error::{Error, Result};
use waypoint_domain::ports::{CacheStore, StoreCommand, StoreReply};
use waypoint_domain::value_objects::{SetCondition, StoreInfo};

use super::Expiry;
use crate::constants::{REDIS_RELEASE_SCRIPT, REDIS_SCAN_COUNT, REDIS_USED_MEMORY_FIELD};

/// Redis cache store
///
/// Holds a client and, once connected, a `ConnectionManager` that is cloned
/// per command. Clones share one multiplexed socket.
pub struct RedisCacheStore {
    client: Client,
    manager: RwLock<Option<ConnectionManager>>,
    scan_count: usize,
}

impl RedisCacheStore {
    /// Create a store from a connection URL without connecting
    ///
    /// # Arguments
    ///
    /// * `connection_string` - Redis URL (e.g., "redis://localhost:6379")
    pub fn new(connection_string: &str) -> Result<Self> {
        let client = Client::open(connection_string).map_err(|e| {
            Error::connect_with_source(
                "redis",
                format!("Invalid Redis URL '{connection_string}': {e}"),
                e,
            )
        })?;

        Ok(Self {
            client,
            manager: RwLock::new(None),
            scan_count: REDIS_SCAN_COUNT,
        })
    }

    /// Create a store with host and port
    pub fn with_host_port(host: &str, port: u16) -> Result<Self> {
        Self::new(&format!("redis://{host}:{port}"))
    }

    /// Override the `COUNT` hint used by `SCAN`
    #[must_use]
    pub fn with_scan_count(mut self, scan_count: usize) -> Self {
        self.scan_count = scan_count.max(1);
        self
    }

    /// Establish the managed connection
    ///
    /// Fails with a connect error when Redis is unreachable within `timeout`.
    pub async fn connect(&self, timeout: Duration) -> Result<()> {
        let manager = tokio::time::timeout(timeout, self.client.get_connection_manager())
            .await
            .map_err(|_| {
                Error::connect("redis", format!("Timed out after {}ms", timeout.as_millis()))
            })?
            .map_err(|e| Error::connect_with_source("redis", e.to_string(), e))?;

        let mut slot = self
            .manager
            .write()
            .map_err(|_| Error::internal("Redis connection lock poisoned"))?;
        *slot = Some(manager);
        tracing::debug!("Redis connection established");
        Ok(())
    }

    /// Create and connect in one step
    pub async fn open(connection_string: &str, timeout: Duration) -> Result<Self> {
        let store = Self::new(connection_string)?;
        store.connect(timeout).await?;
        Ok(store)
    }

    fn connection(&self) -> Result<ConnectionManager> {
        self.manager
            .read()
            .map_err(|_| Error::internal("Redis connection lock poisoned"))?
            .clone()
            .ok_or_else(|| Error::connection("Redis connection is closed"))
    }

    async fn query<T: FromRedisValue>(&self, operation: &str, command: &Cmd) -> Result<T> {
        let mut conn = self.connection()?;
        command
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error(operation, e))
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let mut command = redis::cmd("SCAN");
            command
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(self.scan_count);
            let (next, batch): (u64, Vec<String>) = self.query("SCAN", &command).await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connected = self.manager.read().map(|m| m.is_some()).unwrap_or(false);
        f.debug_struct("RedisCacheStore")
            .field("connected", &connected)
            .field("scan_count", &self.scan_count)
            .finish()
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn ping(&self) -> Result<()> {
        let reply: String = self.query("PING", &redis::cmd("PING")).await?;
        if reply.eq_ignore_ascii_case("PONG") {
            Ok(())
        } else {
            Err(Error::cache_operation(format!("Unexpected PING reply: {reply}")))
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.query("GET", &key_cmd("GET", key)).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
        condition: SetCondition,
    ) -> Result<bool> {
        // nil reply means NX/XX blocked the write
        let command = set_cmd(key, value, ttl, condition);
        let reply: Option<String> = self.query("SET", &command).await?;
        Ok(reply.is_some())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.query("DEL", &multi_key_cmd("DEL", keys)).await
    }

    async fn exists(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.query("EXISTS", &multi_key_cmd("EXISTS", keys)).await
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let updated: i64 = self.query("EXPIRE", &expire_cmd(key, ttl)).await?;
        Ok(updated == 1)
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        self.query("TTL", &key_cmd("TTL", key)).await
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut command = key_cmd("HGET", key);
        command.arg(field);
        self.query("HGET", &command).await
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        let mut command = key_cmd("HSET", key);
        command.arg(field).arg(value);
        let added: i64 = self.query("HSET", &command).await?;
        Ok(added > 0)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        self.query("HGETALL", &key_cmd("HGETALL", key)).await
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut command = key_cmd("HDEL", key);
        command.arg(fields);
        self.query("HDEL", &command).await
    }

    async fn lpush(&self, key: &str, values: &[String]) -> Result<u64> {
        if values.is_empty() {
            return self.llen(key).await;
        }
        let mut command = key_cmd("LPUSH", key);
        command.arg(values);
        self.query("LPUSH", &command).await
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>> {
        self.query("RPOP", &key_cmd("RPOP", key)).await
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        self.query("LLEN", &key_cmd("LLEN", key)).await
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut command = key_cmd("SADD", key);
        command.arg(members);
        self.query("SADD", &command).await
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        self.query("SMEMBERS", &key_cmd("SMEMBERS", key)).await
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        let mut command = key_cmd("SISMEMBER", key);
        command.arg(member);
        let found: i64 = self.query("SISMEMBER", &command).await?;
        Ok(found == 1)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.scan(pattern).await
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool> {
        let mut command = redis::cmd("EVAL");
        command.arg(REDIS_RELEASE_SCRIPT).arg(1).arg(key).arg(expected);
        let deleted: i64 = self.query("EVAL", &command).await?;
        Ok(deleted == 1)
    }

    fn supports_pipeline(&self) -> bool {
        true
    }

    async fn execute_pipeline(&self, commands: &[StoreCommand]) -> Result<Vec<StoreReply>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for command in commands {
            pipe.add_command(build_command(command));
        }

        let mut conn = self.connection()?;
        let values: Vec<Value> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("pipeline", e))?;

        if values.len() != commands.len() {
            return Err(Error::cache_operation(format!(
                "Pipeline returned {} replies for {} commands",
                values.len(),
                commands.len()
            )));
        }

        commands
            .iter()
            .zip(values)
            .map(|(command, value)| reply_from_value(command, value))
            .collect()
    }

    async fn info(&self) -> Result<StoreInfo> {
        let keys: u64 = self.query("DBSIZE", &redis::cmd("DBSIZE")).await?;

        let mut command = redis::cmd("INFO");
        command.arg("memory");
        // memory stats are best-effort; some managed Redis deployments deny INFO
        let used_memory_bytes = match self.query::<String>("INFO", &command).await {
            Ok(info) => parse_used_memory(&info),
            Err(e) => {
                tracing::debug!(error = %e, "INFO memory unavailable");
                None
            }
        };

        Ok(StoreInfo {
            keys,
            used_memory_bytes,
        })
    }

    async fn close(&self) -> Result<()> {
        let previous = self
            .manager
            .write()
            .map_err(|_| Error::internal("Redis connection lock poisoned"))?
            .take();
        if previous.is_some() {
            tracing::debug!("Redis connection closed");
        }
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "redis"
    }
}

// ============================================================================
// Command construction
// ============================================================================

fn key_cmd(name: &str, key: &str) -> Cmd {
    let mut command = redis::cmd(name);
    command.arg(key);
    command
}

fn multi_key_cmd(name: &str, keys: &[String]) -> Cmd {
    let mut command = redis::cmd(name);
    command.arg(keys);
    command
}

fn set_cmd(key: &str, value: &str, ttl: Option<Duration>, condition: SetCondition) -> Cmd {
    let mut command = redis::cmd("SET");
    command.arg(key).arg(value);
    match Expiry::from_ttl(ttl) {
        Some(Expiry::Seconds(secs)) => {
            command.arg("EX").arg(secs);
        }
        Some(Expiry::Millis(millis)) => {
            command.arg("PX").arg(millis);
        }
        None => {}
    }
    if let Some(flag) = condition.as_redis_arg() {
        command.arg(flag);
    }
    command
}

fn expire_cmd(key: &str, ttl: Duration) -> Cmd {
    match Expiry::from_ttl(Some(ttl)) {
        Some(Expiry::Seconds(secs)) => {
            let mut command = key_cmd("EXPIRE", key);
            command.arg(secs);
            command
        }
        Some(Expiry::Millis(millis)) => {
            let mut command = key_cmd("PEXPIRE", key);
            command.arg(millis);
            command
        }
        // zero TTL expires immediately, as in Redis
        None => {
            let mut command = key_cmd("EXPIRE", key);
            command.arg(0);
            command
        }
    }
}

fn build_command(command: &StoreCommand) -> Cmd {
    match command {
        StoreCommand::Get { key } => key_cmd("GET", key),
        StoreCommand::Set {
            key,
            value,
            ttl,
            condition,
        } => set_cmd(key, value, *ttl, *condition),
        StoreCommand::Delete { keys } => multi_key_cmd("DEL", keys),
        StoreCommand::Exists { keys } => multi_key_cmd("EXISTS", keys),
        StoreCommand::Expire { key, ttl } => expire_cmd(key, *ttl),
        StoreCommand::Ttl { key } => key_cmd("TTL", key),
        StoreCommand::HGet { key, field } => {
            let mut cmd = key_cmd("HGET", key);
            cmd.arg(field);
            cmd
        }
        StoreCommand::HSet { key, field, value } => {
            let mut cmd = key_cmd("HSET", key);
            cmd.arg(field).arg(value);
            cmd
        }
        StoreCommand::HGetAll { key } => key_cmd("HGETALL", key),
        StoreCommand::HDel { key, fields } => {
            let mut cmd = key_cmd("HDEL", key);
            cmd.arg(fields);
            cmd
        }
        StoreCommand::LPush { key, values } => {
            let mut cmd = key_cmd("LPUSH", key);
            cmd.arg(values);
            cmd
        }
        StoreCommand::RPop { key } => key_cmd("RPOP", key),
        StoreCommand::LLen { key } => key_cmd("LLEN", key),
        StoreCommand::SAdd { key, members } => {
            let mut cmd = key_cmd("SADD", key);
            cmd.arg(members);
            cmd
        }
        StoreCommand::SMembers { key } => key_cmd("SMEMBERS", key),
        StoreCommand::SIsMember { key, member } => {
            let mut cmd = key_cmd("SISMEMBER", key);
            cmd.arg(member);
            cmd
        }
    }
}

// ============================================================================
// Reply conversion
// ============================================================================

fn map_redis_error(operation: &str, error: RedisError) -> Error {
    let message = format!("Redis {operation} failed: {error}");
    if error.is_io_error()
        || error.is_timeout()
        || error.is_connection_dropped()
        || error.is_connection_refusal()
    {
        Error::connection_with_source(message, error)
    } else {
        Error::cache_operation_with_source(message, error)
    }
}

fn unexpected(command: &StoreCommand, value: &Value) -> Error {
    Error::cache_operation(format!(
        "Unexpected reply to {}: {value:?}",
        command.name()
    ))
}

fn value_to_string(command: &StoreCommand, value: Value) -> Result<Option<String>> {
    match value {
        Value::Nil => Ok(None),
        Value::BulkString(bytes) => String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| Error::cache_operation(format!("Non-UTF-8 reply: {e}"))),
        Value::SimpleString(text) => Ok(Some(text)),
        Value::Okay => Ok(Some("OK".to_string())),
        other => Err(unexpected(command, &other)),
    }
}

fn required_string(command: &StoreCommand, value: Value) -> Result<String> {
    value_to_string(command, value)?
        .ok_or_else(|| Error::cache_operation(format!("Nil element in {} reply", command.name())))
}

fn reply_from_value(command: &StoreCommand, value: Value) -> Result<StoreReply> {
    match command {
        StoreCommand::Get { .. } | StoreCommand::HGet { .. } | StoreCommand::RPop { .. } => {
            Ok(StoreReply::Value(value_to_string(command, value)?))
        }
        StoreCommand::Set { .. } => match value {
            Value::Nil => Ok(StoreReply::Bool(false)),
            Value::Okay | Value::SimpleString(_) | Value::BulkString(_) => {
                Ok(StoreReply::Bool(true))
            }
            other => Err(unexpected(command, &other)),
        },
        StoreCommand::Expire { .. } | StoreCommand::SIsMember { .. } => match value {
            Value::Int(n) => Ok(StoreReply::Bool(n == 1)),
            Value::Boolean(b) => Ok(StoreReply::Bool(b)),
            other => Err(unexpected(command, &other)),
        },
        StoreCommand::HSet { .. } => match value {
            Value::Int(n) => Ok(StoreReply::Bool(n > 0)),
            other => Err(unexpected(command, &other)),
        },
        StoreCommand::Delete { .. }
        | StoreCommand::Exists { .. }
        | StoreCommand::Ttl { .. }
        | StoreCommand::HDel { .. }
        | StoreCommand::LPush { .. }
        | StoreCommand::LLen { .. }
        | StoreCommand::SAdd { .. } => match value {
            Value::Int(n) => Ok(StoreReply::Int(n)),
            other => Err(unexpected(command, &other)),
        },
        StoreCommand::HGetAll { .. } => {
            let pairs = match value {
                Value::Map(pairs) => pairs,
                Value::Array(items) => {
                    let mut pairs = Vec::with_capacity(items.len() / 2);
                    let mut items = items.into_iter();
                    while let (Some(field), Some(value)) = (items.next(), items.next()) {
                        pairs.push((field, value));
                    }
                    pairs
                }
                Value::Nil => Vec::new(),
                other => return Err(unexpected(command, &other)),
            };
            let mut hash = HashMap::with_capacity(pairs.len());
            for (field, value) in pairs {
                hash.insert(
                    required_string(command, field)?,
                    required_string(command, value)?,
                );
            }
            Ok(StoreReply::Hash(hash))
        }
        StoreCommand::SMembers { .. } => {
            let items = match value {
                Value::Set(items) | Value::Array(items) => items,
                Value::Nil => Vec::new(),
                other => return Err(unexpected(command, &other)),
            };
            let mut members = HashSet::with_capacity(items.len());
            for item in items {
                members.insert(required_string(command, item)?);
            }
            Ok(StoreReply::Members(members))
        }
    }
}

fn parse_used_memory(info: &str) -> Option<u64> {
    info.lines()
        .find_map(|line| line.strip_prefix(REDIS_USED_MEMORY_FIELD))
        .and_then(|raw| raw.trim().parse().ok())
}
