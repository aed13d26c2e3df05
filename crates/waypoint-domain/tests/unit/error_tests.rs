//! Unit tests for domain error types

use waypoint_domain::Error;

#[test]
fn test_not_registered_error() {
    let error = Error::not_registered("weather");
    match &error {
        Error::NotRegistered { name } => assert_eq!(name, "weather"),
        _ => panic!("Expected NotRegistered error"),
    }
    assert!(error.to_string().contains("weather"));
}

#[test]
fn test_connect_error() {
    let error = Error::connect("cache", "connection refused");
    match &error {
        Error::Connect {
            service, message, ..
        } => {
            assert_eq!(service, "cache");
            assert_eq!(message, "connection refused");
        }
        _ => panic!("Expected Connect error"),
    }
    assert!(error.is_connection());
}

#[test]
fn test_connection_error_with_source() {
    let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "deadline elapsed");
    let error = Error::connection_with_source("GET timed out", io);
    assert!(error.is_connection());
    assert!(std::error::Error::source(&error).is_some());
}

#[test]
fn test_cache_operation_error_is_not_connection() {
    let error = Error::cache_operation("WRONGTYPE");
    assert!(!error.is_connection());
    assert!(error.to_string().contains("WRONGTYPE"));
}

#[test]
fn test_serialization_error_from_json() {
    let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let error: Error = json_error.into();
    assert!(matches!(error, Error::Serialization { .. }));
}

#[test]
fn test_configuration_and_argument_errors() {
    assert!(matches!(
        Error::configuration("bad"),
        Error::Configuration { .. }
    ));
    assert!(matches!(
        Error::invalid_argument("empty name"),
        Error::InvalidArgument { .. }
    ));
    assert!(matches!(Error::internal("oops"), Error::Internal { .. }));
}
