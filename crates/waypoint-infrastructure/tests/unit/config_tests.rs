//! Configuration loading and validation tests

use std::io::Write;

use tempfile::NamedTempFile;
use waypoint_domain::value_objects::IntegrationMode;
use waypoint_infrastructure::config::loader::validate_app_config;
use waypoint_infrastructure::config::{AppConfig, ConfigLoader};
use waypoint_infrastructure::logging::parse_log_level;

/// Loader isolated from any `WAYPOINT_*` variables in the test environment
fn isolated_loader(path: &std::path::Path) -> ConfigLoader {
    ConfigLoader::new()
        .with_config_path(path)
        .with_env_prefix("WAYPOINT_UNIT_TEST_UNSET")
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_defaults_are_valid() {
    let config = AppConfig::default();
    assert!(validate_app_config(&config).is_ok());
    assert_eq!(config.cache.namespace, "waypoint");
    assert_eq!(config.lock.ttl_secs, 30);
    assert_eq!(config.lock.retry_delay_ms, 100);
    assert_eq!(config.lock.retry_count, 10);
    assert_eq!(config.integrations.default_mode, IntegrationMode::Direct);
}

#[test]
fn test_load_from_toml_file() {
    let file = write_config(
        r#"
[cache]
redis_url = "redis://cache.internal:6380"
namespace = "trips"
operation_timeout_ms = 750

[lock]
ttl_secs = 5

[integrations]
default_mode = "mcp"

[integrations.services]
cache = "direct"
"#,
    );

    let config = isolated_loader(file.path()).load().unwrap();
    assert_eq!(config.cache.redis_url, "redis://cache.internal:6380");
    assert_eq!(config.cache.namespace, "trips");
    assert_eq!(config.cache.operation_timeout_ms, 750);
    // untouched fields keep their defaults
    assert_eq!(config.cache.connect_timeout_ms, 5000);
    assert_eq!(config.lock.ttl_secs, 5);
    assert_eq!(config.integrations.default_mode, IntegrationMode::Mcp);
    assert_eq!(
        config.integrations.mode_for("cache"),
        IntegrationMode::Direct
    );
    assert_eq!(config.integrations.mode_for("flights"), IntegrationMode::Mcp);
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = isolated_loader(&dir.path().join("absent.toml"))
        .load()
        .unwrap();
    assert_eq!(config.cache.namespace, "waypoint");
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = write_config("[lock]\nttl_secs = 0\n");
    let err = isolated_loader(file.path()).load().unwrap_err();
    assert!(err.to_string().contains("Lock TTL cannot be 0"));

    let file = write_config("[cache]\nredis_url = \"http://not-redis\"\n");
    assert!(isolated_loader(file.path()).load().is_err());

    let file = write_config("[cache]\nnamespace = \"  \"\n");
    assert!(isolated_loader(file.path()).load().is_err());

    let file = write_config("[logging]\nlevel = \"loud\"\n");
    assert!(isolated_loader(file.path()).load().is_err());
}

#[test]
fn test_invalid_mode_in_file_fails_to_load() {
    let file = write_config("[integrations]\ndefault_mode = \"grpc\"\n");
    assert!(isolated_loader(file.path()).load().is_err());
}

#[test]
fn test_save_and_reload_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("waypoint.toml");

    let mut config = AppConfig::default();
    config.cache.namespace = "saved".to_string();
    config
        .integrations
        .services
        .insert("cache".to_string(), IntegrationMode::Mcp);

    let loader = isolated_loader(&path);
    loader.save_to_file(&config, &path).unwrap();
    let reloaded = loader.load().unwrap();

    assert_eq!(reloaded.cache.namespace, "saved");
    assert_eq!(reloaded.integrations.mode_for("cache"), IntegrationMode::Mcp);
}

#[test]
fn test_parse_log_level() {
    assert!(parse_log_level("INFO").is_ok());
    assert!(parse_log_level("warning").is_ok());
    assert!(parse_log_level("verbose").is_err());
}
