//! Unit tests for content classification

use waypoint_domain::classifier::{classify, classify_domains, classify_query};
use waypoint_domain::value_objects::ContentType;

#[test]
fn test_realtime_query() {
    assert_eq!(classify("current weather in Rome", &[]), ContentType::Realtime);
}

#[test]
fn test_static_query() {
    assert_eq!(classify("history of Rome", &[]), ContentType::Static);
}

#[test]
fn test_domain_takes_priority_over_query() {
    assert_eq!(
        classify("Rome travel guide", &["wikipedia.org"]),
        ContentType::Static
    );
    // Query alone would be realtime, the reference domain still wins
    assert_eq!(
        classify("current weather in Rome", &["https://en.wikipedia.org/wiki/Rome"]),
        ContentType::Static
    );
}

#[test]
fn test_time_sensitive_query() {
    assert_eq!(classify_query("latest news from Lisbon"), ContentType::TimeSensitive);
    assert_eq!(classify_query("concert events this weekend"), ContentType::TimeSensitive);
}

#[test]
fn test_realtime_beats_time_sensitive_in_query() {
    assert_eq!(classify_query("today's weather"), ContentType::Realtime);
}

#[test]
fn test_default_is_daily() {
    assert_eq!(classify("Rome travel guide", &[]), ContentType::Daily);
    assert_eq!(classify("", &[]), ContentType::Daily);
}

#[test]
fn test_keywords_match_whole_words_only() {
    // "know" must not match "now", "snowy" must not match "now"
    assert_eq!(classify_query("things to know about snowy Oslo"), ContentType::Daily);
}

#[test]
fn test_case_insensitive() {
    assert_eq!(classify_query("CURRENT WEATHER"), ContentType::Realtime);
    assert_eq!(classify_domains(&["WWW.BBC.COM"]), Some(ContentType::TimeSensitive));
}

#[test]
fn test_domain_bucket_priority() {
    assert_eq!(
        classify_domains(&["wikipedia.org", "flightaware.com"]),
        Some(ContentType::Realtime)
    );
    assert_eq!(classify_domains(&["example.com"]), None);
}

#[test]
fn test_classification_is_deterministic() {
    let first = classify("current weather in Rome", &[]);
    for _ in 0..100 {
        assert_eq!(classify("current weather in Rome", &[]), first);
    }
}
