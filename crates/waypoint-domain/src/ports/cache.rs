//! Cache Store Port
//!
//! Port for key/value backends speaking a Redis-compatible command set.
//! Implementations live in `waypoint-providers`: a direct Redis client, a
//! legacy MCP tool-call wrapper, and a process-local store.
//!
//! Store methods are raw: every failure is returned. Absorbing failures into
//! misses is the job of the client facade above the store.

use crate::error::Result;
use crate::value_objects::{SetCondition, StoreInfo};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;

/// One command queued in a pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCommand {
    /// `GET key`
    Get { key: String },
    /// `SET key value [EX|PX ttl] [NX|XX]`
    Set {
        key: String,
        value: String,
        ttl: Option<Duration>,
        condition: SetCondition,
    },
    /// `DEL key...`
    Delete { keys: Vec<String> },
    /// `EXISTS key...`
    Exists { keys: Vec<String> },
    /// `EXPIRE key seconds`
    Expire { key: String, ttl: Duration },
    /// `TTL key`
    Ttl { key: String },
    /// `HGET key field`
    HGet { key: String, field: String },
    /// `HSET key field value`
    HSet {
        key: String,
        field: String,
        value: String,
    },
    /// `HGETALL key`
    HGetAll { key: String },
    /// `HDEL key field...`
    HDel { key: String, fields: Vec<String> },
    /// `LPUSH key value...`
    LPush { key: String, values: Vec<String> },
    /// `RPOP key`
    RPop { key: String },
    /// `LLEN key`
    LLen { key: String },
    /// `SADD key member...`
    SAdd { key: String, members: Vec<String> },
    /// `SMEMBERS key`
    SMembers { key: String },
    /// `SISMEMBER key member`
    SIsMember { key: String, member: String },
}

impl StoreCommand {
    /// Command name as sent on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Get { .. } => "GET",
            Self::Set { .. } => "SET",
            Self::Delete { .. } => "DEL",
            Self::Exists { .. } => "EXISTS",
            Self::Expire { .. } => "EXPIRE",
            Self::Ttl { .. } => "TTL",
            Self::HGet { .. } => "HGET",
            Self::HSet { .. } => "HSET",
            Self::HGetAll { .. } => "HGETALL",
            Self::HDel { .. } => "HDEL",
            Self::LPush { .. } => "LPUSH",
            Self::RPop { .. } => "RPOP",
            Self::LLen { .. } => "LLEN",
            Self::SAdd { .. } => "SADD",
            Self::SMembers { .. } => "SMEMBERS",
            Self::SIsMember { .. } => "SISMEMBER",
        }
    }
}

/// Typed reply to one pipelined command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreReply {
    /// Success flag (`SET`, `EXPIRE`, `SISMEMBER`)
    Bool(bool),
    /// Integer reply (`DEL`, `EXISTS`, `TTL`, counts and lengths)
    Int(i64),
    /// Optional string (`GET`, `HGET`, `RPOP`)
    Value(Option<String>),
    /// Field map (`HGETALL`)
    Hash(HashMap<String, String>),
    /// Member set (`SMEMBERS`)
    Members(HashSet<String>),
}

/// Cache Store Port
///
/// # Example
///
/// ```ignore
/// use waypoint_domain::ports::CacheStore;
/// use waypoint_domain::value_objects::SetCondition;
///
/// let stored = store.set("trip:42", "{}", Some(ttl), SetCondition::IfAbsent).await?;
/// let value = store.get("trip:42").await?;
/// ```
#[async_trait]
pub trait CacheStore: Send + Sync + fmt::Debug {
    /// Round-trip health check
    async fn ping(&self) -> Result<()>;

    /// Get a string value, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a string value
    ///
    /// A `None` or zero `ttl` stores without expiry. Returns `false` when the
    /// condition prevented the write.
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
        condition: SetCondition,
    ) -> Result<bool>;

    /// Delete keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    /// Count how many of `keys` exist
    async fn exists(&self, keys: &[String]) -> Result<u64>;

    /// Set a key's expiry, `false` if the key is absent
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Remaining TTL in seconds, `-1` without expiry, `-2` when absent
    async fn ttl(&self, key: &str) -> Result<i64>;

    /// Get one hash field
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Set one hash field, `true` if the field is new
    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool>;

    /// Get every field of a hash, empty when absent
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Delete hash fields, returning how many existed
    async fn hdel(&self, key: &str, fields: &[String]) -> Result<u64>;

    /// Push values to the head of a list, returning the new length
    async fn lpush(&self, key: &str, values: &[String]) -> Result<u64>;

    /// Pop from the tail of a list
    async fn rpop(&self, key: &str) -> Result<Option<String>>;

    /// Length of a list, zero when absent
    async fn llen(&self, key: &str) -> Result<u64>;

    /// Add set members, returning how many were new
    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64>;

    /// Members of a set, empty when absent
    async fn smembers(&self, key: &str) -> Result<HashSet<String>>;

    /// Set membership test
    async fn sismember(&self, key: &str, member: &str) -> Result<bool>;

    /// Keys matching a glob pattern (cursor-based scan, not `KEYS`)
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Atomically delete `key` only if it currently holds `expected`
    ///
    /// Must be a single server-side operation. Two client round trips would
    /// let a holder whose lock expired delete the next holder's lock.
    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool>;

    /// Whether `execute_pipeline` sends one round trip
    fn supports_pipeline(&self) -> bool {
        false
    }

    /// Execute commands in order, one reply per command
    ///
    /// The default runs them one at a time; pipelining backends override it.
    async fn execute_pipeline(&self, commands: &[StoreCommand]) -> Result<Vec<StoreReply>> {
        let mut replies = Vec::with_capacity(commands.len());
        for command in commands {
            replies.push(apply_command(self, command).await?);
        }
        Ok(replies)
    }

    /// Backend-reported key count and memory usage
    async fn info(&self) -> Result<StoreInfo>;

    /// Drain and close the underlying connection
    async fn close(&self) -> Result<()>;

    /// Name of the backend implementation
    fn backend_name(&self) -> &str;
}

/// Run a single command through the individual store methods
pub async fn apply_command<S>(store: &S, command: &StoreCommand) -> Result<StoreReply>
where
    S: CacheStore + ?Sized,
{
    let reply = match command {
        StoreCommand::Get { key } => StoreReply::Value(store.get(key).await?),
        StoreCommand::Set {
            key,
            value,
            ttl,
            condition,
        } => StoreReply::Bool(store.set(key, value, *ttl, *condition).await?),
        StoreCommand::Delete { keys } => StoreReply::Int(to_int(store.delete(keys).await?)),
        StoreCommand::Exists { keys } => StoreReply::Int(to_int(store.exists(keys).await?)),
        StoreCommand::Expire { key, ttl } => StoreReply::Bool(store.expire(key, *ttl).await?),
        StoreCommand::Ttl { key } => StoreReply::Int(store.ttl(key).await?),
        StoreCommand::HGet { key, field } => StoreReply::Value(store.hget(key, field).await?),
        StoreCommand::HSet { key, field, value } => {
            StoreReply::Bool(store.hset(key, field, value).await?)
        }
        StoreCommand::HGetAll { key } => StoreReply::Hash(store.hgetall(key).await?),
        StoreCommand::HDel { key, fields } => StoreReply::Int(to_int(store.hdel(key, fields).await?)),
        StoreCommand::LPush { key, values } => {
            StoreReply::Int(to_int(store.lpush(key, values).await?))
        }
        StoreCommand::RPop { key } => StoreReply::Value(store.rpop(key).await?),
        StoreCommand::LLen { key } => StoreReply::Int(to_int(store.llen(key).await?)),
        StoreCommand::SAdd { key, members } => {
            StoreReply::Int(to_int(store.sadd(key, members).await?))
        }
        StoreCommand::SMembers { key } => StoreReply::Members(store.smembers(key).await?),
        StoreCommand::SIsMember { key, member } => {
            StoreReply::Bool(store.sismember(key, member).await?)
        }
    };
    Ok(reply)
}

fn to_int(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}
