//! Unit tests for key derivation

use serde_json::json;
use std::collections::BTreeMap;
use waypoint_domain::keys::{lock_key, memo_key, namespaced, prefix_pattern};

#[test]
fn test_namespaced_key() {
    assert_eq!(namespaced("waypoint", "weather:rome"), "waypoint:weather:rome");
}

#[test]
fn test_lock_key() {
    assert_eq!(lock_key("refresh-rates"), "lock:refresh-rates");
}

#[test]
fn test_prefix_pattern() {
    assert_eq!(prefix_pattern("weather"), "weather:*");
}

#[test]
fn test_memo_key_is_stable_and_prefixed() {
    let args = vec![json!("Rome"), json!(3)];
    let kwargs = BTreeMap::from([("units".to_string(), json!("metric"))]);

    let first = memo_key("weather", &args, &kwargs);
    let second = memo_key("weather", &args, &kwargs);

    assert_eq!(first, second);
    assert!(first.starts_with("weather:"));
    // sha256 hex digest
    assert_eq!(first.len(), "weather:".len() + 64);
}

#[test]
fn test_memo_key_ignores_keyword_order() {
    let mut a = BTreeMap::new();
    a.insert("units".to_string(), json!("metric"));
    a.insert("days".to_string(), json!(3));

    let mut b = BTreeMap::new();
    b.insert("days".to_string(), json!(3));
    b.insert("units".to_string(), json!("metric"));

    assert_eq!(memo_key("p", &[], &a), memo_key("p", &[], &b));
}

#[test]
fn test_memo_key_ignores_nested_object_order() {
    let first = json!({"lat": 41.9, "lon": 12.5});
    let second = json!({"lon": 12.5, "lat": 41.9});
    assert_eq!(
        memo_key("p", &[first], &BTreeMap::new()),
        memo_key("p", &[second], &BTreeMap::new())
    );
}

#[test]
fn test_memo_key_distinguishes_arguments() {
    let kwargs = BTreeMap::new();
    assert_ne!(
        memo_key("p", &[json!("Rome")], &kwargs),
        memo_key("p", &[json!("Paris")], &kwargs)
    );
    assert_ne!(
        memo_key("p", &[json!("Rome")], &kwargs),
        memo_key("q", &[json!("Rome")], &kwargs)
    );
}
