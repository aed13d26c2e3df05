//! Cache service adapter tests

use std::sync::Arc;
use std::time::Duration;

use waypoint_domain::error::Error;
use waypoint_domain::ports::ServiceAdapter;
use waypoint_domain::value_objects::IntegrationMode;
use waypoint_infrastructure::cache::{
    CacheClient, CacheServiceAdapter, InMemoryConnector, McpConnector, RedisConnector,
};
use waypoint_infrastructure::config::AppConfig;
use waypoint_infrastructure::flags::IntegrationFlags;

fn adapter_with(
    mode: IntegrationMode,
) -> (
    CacheServiceAdapter,
    Arc<IntegrationFlags>,
    Arc<InMemoryConnector>,
    Arc<InMemoryConnector>,
) {
    let flags = Arc::new(IntegrationFlags::new(mode));
    let direct = Arc::new(InMemoryConnector::new("direct-memory"));
    let mcp = Arc::new(InMemoryConnector::new("mcp-memory"));
    let adapter = CacheServiceAdapter::with_connectors(
        Arc::clone(&flags),
        &AppConfig::default(),
        direct.clone(),
        mcp.clone(),
    );
    (adapter, flags, direct, mcp)
}

#[tokio::test]
async fn test_mode_selects_connector() {
    let (adapter, flags, direct, mcp) = adapter_with(IntegrationMode::Mcp);
    assert_eq!(adapter.service_name(), "cache");
    assert!(!adapter.is_direct());

    let instance = adapter.get_service_instance().await.unwrap();
    assert_eq!(instance.implementation(), "mcp-memory");
    assert_eq!((direct.connects(), mcp.connects()), (0, 1));

    flags.set_mode("cache", IntegrationMode::Direct);
    assert!(adapter.is_direct());
    let instance = adapter.get_service_instance().await.unwrap();
    assert_eq!(instance.implementation(), "direct-memory");
    assert_eq!((direct.connects(), mcp.connects()), (1, 1));
}

#[tokio::test]
async fn test_instance_is_a_cache_client() {
    let (adapter, _flags, _direct, _mcp) = adapter_with(IntegrationMode::Direct);
    let instance = adapter.get_service_instance().await.unwrap();

    let cache = instance.downcast_arc::<CacheClient>().unwrap();
    assert!(cache.set("k", "v", None).await);
    assert_eq!(cache.namespace(), "waypoint");
}

#[tokio::test]
async fn test_named_adapter_reads_its_own_flag() {
    let (adapter, flags, _direct, _mcp) = adapter_with(IntegrationMode::Direct);
    let adapter = adapter.named("session-cache");
    flags.set_mode("session-cache", IntegrationMode::Mcp);

    assert_eq!(adapter.service_name(), "session-cache");
    assert_eq!(adapter.integration_mode(), IntegrationMode::Mcp);
}

#[tokio::test]
async fn test_unreachable_redis_is_a_connect_error() {
    let flags = Arc::new(IntegrationFlags::new(IntegrationMode::Direct));
    let adapter = CacheServiceAdapter::with_connectors(
        flags,
        &AppConfig::default(),
        Arc::new(RedisConnector::new(
            "redis://127.0.0.1:1",
            Duration::from_millis(500),
        )),
        Arc::new(InMemoryConnector::new("unused")),
    );

    let err = adapter.get_service_instance().await.unwrap_err();
    assert!(matches!(err, Error::Connect { .. }), "got {err}");
}

#[tokio::test]
async fn test_unreachable_mcp_server_is_a_connect_error() {
    let flags = Arc::new(IntegrationFlags::new(IntegrationMode::Mcp));
    let adapter = CacheServiceAdapter::with_connectors(
        flags,
        &AppConfig::default(),
        Arc::new(InMemoryConnector::new("unused")),
        Arc::new(McpConnector::new(
            "http://127.0.0.1:1/mcp",
            Duration::from_millis(500),
        )),
    );

    let err = adapter.get_service_instance().await.unwrap_err();
    assert!(matches!(err, Error::Connect { .. }), "got {err}");
}
