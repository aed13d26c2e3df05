//! Unit tests for value objects

use std::time::Duration;
use waypoint_domain::value_objects::{
    CacheStats, ContentType, IntegrationMode, SetCondition, integration_env_var,
};

#[test]
fn test_content_type_ttl_table() {
    assert_eq!(ContentType::Realtime.ttl(), Duration::from_secs(60));
    assert_eq!(ContentType::TimeSensitive.ttl(), Duration::from_secs(900));
    assert_eq!(ContentType::Daily.ttl(), Duration::from_secs(86_400));
    assert_eq!(ContentType::SemiStatic.ttl(), Duration::from_secs(7 * 86_400));
    assert_eq!(ContentType::Static.ttl(), Duration::from_secs(30 * 86_400));
}

#[test]
fn test_content_type_buckets_are_ordered_by_ttl() {
    let ttls: Vec<u64> = ContentType::ALL.iter().map(|c| c.ttl_secs()).collect();
    let mut sorted = ttls.clone();
    sorted.sort_unstable();
    assert_eq!(ttls, sorted);
}

#[test]
fn test_content_type_serde() {
    let json = serde_json::to_string(&ContentType::TimeSensitive).unwrap();
    assert_eq!(json, "\"TIME_SENSITIVE\"");
    assert_eq!(ContentType::SemiStatic.to_string(), "SEMI_STATIC");
}

#[test]
fn test_integration_mode_parse_is_case_insensitive() {
    assert_eq!("MCP".parse::<IntegrationMode>().unwrap(), IntegrationMode::Mcp);
    assert_eq!(" Direct ".parse::<IntegrationMode>().unwrap(), IntegrationMode::Direct);
    assert!("grpc".parse::<IntegrationMode>().is_err());
}

#[test]
fn test_integration_mode_defaults_to_direct() {
    assert_eq!(IntegrationMode::default(), IntegrationMode::Direct);
    assert!(IntegrationMode::Direct.is_direct());
    assert!(!IntegrationMode::Mcp.is_direct());
}

#[test]
fn test_integration_env_var() {
    assert_eq!(integration_env_var("cache"), "FEATURE_CACHE_INTEGRATION");
    assert_eq!(
        integration_env_var("weather-api"),
        "FEATURE_WEATHER_API_INTEGRATION"
    );
}

#[test]
fn test_set_condition_redis_args() {
    assert_eq!(SetCondition::Always.as_redis_arg(), None);
    assert_eq!(SetCondition::IfAbsent.as_redis_arg(), Some("NX"));
    assert_eq!(SetCondition::IfPresent.as_redis_arg(), Some("XX"));
}

#[test]
fn test_cache_stats_hit_rate() {
    let stats = CacheStats {
        hits: 3,
        misses: 1,
        ..CacheStats::default()
    };
    assert!((stats.calculate_hit_rate() - 0.75).abs() < f64::EPSILON);
    assert!(CacheStats::new().calculate_hit_rate().abs() < f64::EPSILON);
}
