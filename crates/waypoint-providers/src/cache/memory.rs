//! In-memory cache store
//!
//! Process-local store with Redis semantics for strings, hashes, lists and
//! sets. Expiry is lazy: expired entries are dropped when touched or
//! listed. Intended for development and tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use globset::Glob;
use waypoint_domain::constants::{TTL_KEY_ABSENT, TTL_NO_EXPIRY};
use waypoint_domain::error::{Error, Result};
use waypoint_domain::ports::CacheStore;
use waypoint_domain::value_objects::{SetCondition, StoreInfo};

use super::Expiry;
use crate::constants::{MEMORY_BACKEND_NAME, WRONGTYPE_MESSAGE};

#[derive(Debug, Clone)]
enum Data {
    Str(String),
    Hash(HashMap<String, String>),
    List(VecDeque<String>),
    Set(HashSet<String>),
}

impl Data {
    fn is_empty_collection(&self) -> bool {
        match self {
            Self::Str(_) => false,
            Self::Hash(hash) => hash.is_empty(),
            Self::List(list) => list.is_empty(),
            Self::Set(set) => set.is_empty(),
        }
    }

    fn approximate_size(&self) -> u64 {
        let bytes = match self {
            Self::Str(s) => s.len(),
            Self::Hash(hash) => hash.iter().map(|(f, v)| f.len() + v.len()).sum(),
            Self::List(list) => list.iter().map(String::len).sum(),
            Self::Set(set) => set.iter().map(String::len).sum(),
        };
        bytes as u64
    }
}

#[derive(Debug, Clone)]
struct StoredValue {
    data: Data,
    expires_at: Option<Instant>,
}

impl StoredValue {
    fn new(data: Data) -> Self {
        Self {
            data,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn wrong_type() -> Error {
    Error::cache_operation(WRONGTYPE_MESSAGE)
}

/// In-memory cache store
///
/// Backed by a `DashMap`; every operation is atomic per key. Closing the
/// store makes later operations fail with a connection error.
#[derive(Debug)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, StoredValue>,
    name: String,
    closed: AtomicBool,
}

impl Default for InMemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCacheStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::named(MEMORY_BACKEND_NAME)
    }

    /// Create an empty store reporting `name` as its backend
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            entries: DashMap::new(),
            name: name.into(),
            closed: AtomicBool::new(false),
        }
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::connection(format!("{} store is closed", self.name)));
        }
        Ok(())
    }

    fn purge_if_expired(&self, key: &str) {
        let now = Instant::now();
        self.entries.remove_if(key, |_, value| value.is_expired(now));
    }

    fn drop_if_empty(&self, key: &str) {
        self.entries
            .remove_if(key, |_, value| value.data.is_empty_collection());
    }

    /// Read the live value under `key` through `read`
    fn read<T>(&self, key: &str, read: impl FnOnce(&Data) -> Result<T>) -> Result<Option<T>> {
        self.ensure_open()?;
        self.purge_if_expired(key);
        match self.entries.get(key) {
            Some(value) => read(&value.data).map(Some),
            None => Ok(None),
        }
    }

    /// Mutate the value under `key`, creating it with `init` when absent
    fn write<T>(
        &self,
        key: &str,
        init: impl FnOnce() -> Data,
        write: impl FnOnce(&mut Data) -> Result<T>,
    ) -> Result<T> {
        self.ensure_open()?;
        self.purge_if_expired(key);
        let result = {
            let mut value = self
                .entries
                .entry(key.to_string())
                .or_insert_with(|| StoredValue::new(init()));
            write(&mut value.data)
        };
        self.drop_if_empty(key);
        result
    }

    /// Mutate the value under `key` only if it exists
    fn modify<T>(&self, key: &str, write: impl FnOnce(&mut Data) -> Result<T>) -> Result<Option<T>> {
        self.ensure_open()?;
        self.purge_if_expired(key);
        let result = match self.entries.get_mut(key) {
            Some(mut value) => write(&mut value.data).map(Some),
            None => Ok(None),
        };
        self.drop_if_empty(key);
        result
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn ping(&self) -> Result<()> {
        self.ensure_open()
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self.read(key, |data| match data {
            Data::Str(s) => Ok(s.clone()),
            _ => Err(wrong_type()),
        })?;
        Ok(value)
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
        condition: SetCondition,
    ) -> Result<bool> {
        self.ensure_open()?;
        let now = Instant::now();
        let stored = StoredValue {
            data: Data::Str(value.to_string()),
            expires_at: Expiry::from_ttl(ttl).map(|e| now + e.as_duration()),
        };

        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let live = !occupied.get().is_expired(now);
                match (condition, live) {
                    (SetCondition::IfAbsent, true) => Ok(false),
                    (SetCondition::IfPresent, false) => {
                        occupied.remove();
                        Ok(false)
                    }
                    _ => {
                        occupied.insert(stored);
                        Ok(true)
                    }
                }
            }
            Entry::Vacant(vacant) => {
                if condition == SetCondition::IfPresent {
                    return Ok(false);
                }
                vacant.insert(stored);
                Ok(true)
            }
        }
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        self.ensure_open()?;
        let now = Instant::now();
        let removed = keys
            .iter()
            .filter_map(|key| self.entries.remove(key))
            .filter(|(_, value)| !value.is_expired(now))
            .count();
        Ok(removed as u64)
    }

    async fn exists(&self, keys: &[String]) -> Result<u64> {
        self.ensure_open()?;
        let count = keys
            .iter()
            .filter(|key| {
                self.purge_if_expired(key);
                self.entries.contains_key(key.as_str())
            })
            .count();
        Ok(count as u64)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        self.ensure_open()?;
        self.purge_if_expired(key);
        match Expiry::from_ttl(Some(ttl)) {
            Some(expiry) => match self.entries.get_mut(key) {
                Some(mut value) => {
                    value.expires_at = Some(Instant::now() + expiry.as_duration());
                    Ok(true)
                }
                None => Ok(false),
            },
            // zero TTL expires immediately
            None => Ok(self.entries.remove(key).is_some()),
        }
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        self.ensure_open()?;
        self.purge_if_expired(key);
        let Some(value) = self.entries.get(key) else {
            return Ok(TTL_KEY_ABSENT);
        };
        let Some(expires_at) = value.expires_at else {
            return Ok(TTL_NO_EXPIRY);
        };
        let remaining = expires_at.saturating_duration_since(Instant::now());
        // rounded to the nearest second, like Redis
        let secs = (remaining.as_millis() + 500) / 1000;
        Ok(i64::try_from(secs).unwrap_or(i64::MAX))
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let value = self.read(key, |data| match data {
            Data::Hash(hash) => Ok(hash.get(field).cloned()),
            _ => Err(wrong_type()),
        })?;
        Ok(value.flatten())
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        self.write(
            key,
            || Data::Hash(HashMap::new()),
            |data| match data {
                Data::Hash(hash) => Ok(hash.insert(field.to_string(), value.to_string()).is_none()),
                _ => Err(wrong_type()),
            },
        )
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        let hash = self.read(key, |data| match data {
            Data::Hash(hash) => Ok(hash.clone()),
            _ => Err(wrong_type()),
        })?;
        Ok(hash.unwrap_or_default())
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> Result<u64> {
        let removed = self.modify(key, |data| match data {
            Data::Hash(hash) => Ok(fields.iter().filter(|f| hash.remove(*f).is_some()).count()),
            _ => Err(wrong_type()),
        })?;
        Ok(removed.unwrap_or(0) as u64)
    }

    async fn lpush(&self, key: &str, values: &[String]) -> Result<u64> {
        if values.is_empty() {
            return self.llen(key).await;
        }
        let len = self.write(
            key,
            || Data::List(VecDeque::new()),
            |data| match data {
                Data::List(list) => {
                    for value in values {
                        list.push_front(value.clone());
                    }
                    Ok(list.len())
                }
                _ => Err(wrong_type()),
            },
        )?;
        Ok(len as u64)
    }

    async fn rpop(&self, key: &str) -> Result<Option<String>> {
        let popped = self.modify(key, |data| match data {
            Data::List(list) => Ok(list.pop_back()),
            _ => Err(wrong_type()),
        })?;
        Ok(popped.flatten())
    }

    async fn llen(&self, key: &str) -> Result<u64> {
        let len = self.read(key, |data| match data {
            Data::List(list) => Ok(list.len()),
            _ => Err(wrong_type()),
        })?;
        Ok(len.unwrap_or(0) as u64)
    }

    async fn sadd(&self, key: &str, members: &[String]) -> Result<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        let added = self.write(
            key,
            || Data::Set(HashSet::new()),
            |data| match data {
                Data::Set(set) => Ok(members.iter().filter(|m| set.insert((*m).clone())).count()),
                _ => Err(wrong_type()),
            },
        )?;
        Ok(added as u64)
    }

    async fn smembers(&self, key: &str) -> Result<HashSet<String>> {
        let members = self.read(key, |data| match data {
            Data::Set(set) => Ok(set.clone()),
            _ => Err(wrong_type()),
        })?;
        Ok(members.unwrap_or_default())
    }

    async fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        let found = self.read(key, |data| match data {
            Data::Set(set) => Ok(set.contains(member)),
            _ => Err(wrong_type()),
        })?;
        Ok(found.unwrap_or(false))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.ensure_open()?;
        let matcher = Glob::new(pattern)
            .map_err(|e| Error::invalid_argument(format!("Invalid key pattern '{pattern}': {e}")))?
            .compile_matcher();
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now) && matcher.is_match(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }

    async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool> {
        self.ensure_open()?;
        let now = Instant::now();
        let removed = self.entries.remove_if(key, |_, value| {
            !value.is_expired(now) && matches!(&value.data, Data::Str(current) if current == expected)
        });
        Ok(removed.is_some())
    }

    fn supports_pipeline(&self) -> bool {
        true
    }

    async fn info(&self) -> Result<StoreInfo> {
        self.ensure_open()?;
        let now = Instant::now();
        let (keys, bytes) = self
            .entries
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .fold((0u64, 0u64), |(keys, bytes), entry| {
                let size = entry.key().len() as u64 + entry.value().data.approximate_size();
                (keys + 1, bytes + size)
            });
        Ok(StoreInfo {
            keys,
            used_memory_bytes: Some(bytes),
        })
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::debug!(store = %self.name, "in-memory store closed");
        }
        Ok(())
    }

    fn backend_name(&self) -> &str {
        &self.name
    }
}
