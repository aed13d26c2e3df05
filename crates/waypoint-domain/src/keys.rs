//! Cache key derivation
//!
//! Keys are namespaced strings (`<namespace>:<rest>`). Memoization keys hash
//! a canonical JSON rendering of the call arguments so their length stays
//! bounded and identical arguments always produce the same key.

use crate::constants::{KEY_SEPARATOR, LOCK_KEY_PREFIX};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Prefix `key` with `namespace`, unless it already carries it
pub fn namespaced(namespace: &str, key: &str) -> String {
    if namespace.is_empty() {
        return key.to_string();
    }
    match key.strip_prefix(namespace) {
        Some(rest) if rest.starts_with(KEY_SEPARATOR) => key.to_string(),
        _ => format!("{namespace}{KEY_SEPARATOR}{key}"),
    }
}

/// Derived key holding the lock for `lock_key`
pub fn lock_key(lock_key: &str) -> String {
    format!("{LOCK_KEY_PREFIX}{KEY_SEPARATOR}{lock_key}")
}

/// Glob pattern matching every key under `prefix`
pub fn prefix_pattern(prefix: &str) -> String {
    format!("{prefix}{KEY_SEPARATOR}*")
}

/// Memoization key for a call
///
/// Keyword arguments are ordered by name (the map is a `BTreeMap`) and
/// nested JSON objects serialize with sorted keys, so argument order at the
/// call site never changes the key.
pub fn memo_key(prefix: &str, args: &[Value], kwargs: &BTreeMap<String, Value>) -> String {
    let canonical = json!({ "args": args, "kwargs": kwargs }).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{prefix}{KEY_SEPARATOR}{}", hex::encode(digest))
}
