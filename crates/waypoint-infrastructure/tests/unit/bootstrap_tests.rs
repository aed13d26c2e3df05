//! Application context tests

use std::sync::Arc;

use serde_json::{Value, json};
use waypoint_domain::constants::CACHE_SERVICE_NAME;
use waypoint_domain::value_objects::IntegrationMode;
use waypoint_infrastructure::AppContext;
use waypoint_infrastructure::cache::{InMemoryConnector, MemoizeOptions};
use waypoint_infrastructure::config::AppConfig;
use waypoint_infrastructure::flags::IntegrationFlags;
use waypoint_infrastructure::operations::CLASSIFY_CONTENT_OPERATION;

struct Fixture {
    context: AppContext,
    direct: Arc<InMemoryConnector>,
    mcp: Arc<InMemoryConnector>,
}

fn fixture(mode: IntegrationMode) -> Fixture {
    let flags = Arc::new(IntegrationFlags::new(mode));
    let direct = Arc::new(InMemoryConnector::new("direct-memory"));
    let mcp = Arc::new(InMemoryConnector::new("mcp-memory"));
    let context =
        AppContext::bootstrap_with(AppConfig::default(), flags, direct.clone(), mcp.clone())
            .unwrap();
    Fixture {
        context,
        direct,
        mcp,
    }
}

#[tokio::test]
async fn test_bootstrap_registers_cache_lazily() {
    let f = fixture(IntegrationMode::Direct);

    let statuses = f.context.registry().list_services();
    assert!(statuses.contains_key(CACHE_SERVICE_NAME));
    assert!(!statuses[CACHE_SERVICE_NAME].is_connected);
    assert_eq!(f.direct.connects(), 0);
    assert!(
        f.context
            .operations()
            .names()
            .contains(&CLASSIFY_CONTENT_OPERATION.to_string())
    );
}

#[tokio::test]
async fn test_cache_is_shared() {
    let f = fixture(IntegrationMode::Direct);

    let a = f.context.cache().await.unwrap();
    let b = f.context.cache().await.unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    a.set("k", "v", None).await;
    assert_eq!(b.get("k").await, Some("v".to_string()));
    assert_eq!(f.direct.connects(), 1);
}

#[tokio::test]
async fn test_switch_mode_rebuilds_cache() {
    let f = fixture(IntegrationMode::Direct);
    let before = f.context.cache().await.unwrap();

    let instance = f
        .context
        .switch_mode(CACHE_SERVICE_NAME, IntegrationMode::Mcp)
        .await
        .unwrap();
    assert_eq!(instance.implementation(), "mcp-memory");

    let after = f.context.cache().await.unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!((f.direct.connects(), f.mcp.connects()), (1, 1));
    // the replaced client was closed
    assert!(before.ping().await.is_err());
    assert_eq!(
        f.context.flags().mode(CACHE_SERVICE_NAME),
        IntegrationMode::Mcp
    );
}

#[tokio::test]
async fn test_switch_mode_on_unknown_service_fails() {
    let f = fixture(IntegrationMode::Direct);
    assert!(
        f.context
            .switch_mode("flights", IntegrationMode::Mcp)
            .await
            .is_err()
    );
    assert_eq!(f.context.flags().mode("flights"), IntegrationMode::Direct);
}

#[tokio::test]
async fn test_registered_operations_memoize_through_registry() {
    let mut f = fixture(IntegrationMode::Direct);
    f.context
        .register_operations(|ops, cache| {
            ops.register_cached(
                "echo",
                cache,
                MemoizeOptions::new("echo"),
                |params: Value| async move { Ok(json!({ "echo": params })) },
            )
        })
        .unwrap();

    let result = f
        .context
        .operations()
        .execute("echo", json!({ "q": "history of Rome" }))
        .await
        .unwrap();
    assert_eq!(result["echo"]["q"], json!("history of Rome"));

    let cache = f.context.cache().await.unwrap();
    assert_eq!(cache.keys("echo:*").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_shutdown_closes_services() {
    let f = fixture(IntegrationMode::Direct);
    let cache = f.context.cache().await.unwrap();

    f.context.shutdown().await.unwrap();
    assert!(cache.ping().await.is_err());
    assert!(!f.context.registry().list_services()[CACHE_SERVICE_NAME].is_connected);
}
