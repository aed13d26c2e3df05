//! Service registry lifecycle tests

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use waypoint_domain::error::Error;
use waypoint_domain::value_objects::IntegrationMode;
use waypoint_infrastructure::flags::IntegrationFlags;
use waypoint_infrastructure::registry::ServiceRegistry;

use crate::support::{CountingAdapter, CountingService};

fn setup(name: &str, adapter: CountingAdapter) -> (ServiceRegistry, Arc<CountingAdapter>) {
    let registry = ServiceRegistry::new();
    let adapter = Arc::new(adapter);
    registry.register_service(name, adapter.clone()).unwrap();
    (registry, adapter)
}

fn flags(mode: IntegrationMode) -> Arc<IntegrationFlags> {
    Arc::new(IntegrationFlags::new(mode))
}

#[tokio::test]
async fn test_unknown_service_is_not_registered() {
    let registry = ServiceRegistry::new();
    let err = registry.get_service("ghost").await.unwrap_err();
    assert!(matches!(err, Error::NotRegistered { ref name } if name == "ghost"));
    assert!(registry.refresh_service("ghost").await.is_err());
}

#[tokio::test]
async fn test_empty_name_is_rejected() {
    let registry = ServiceRegistry::new();
    let adapter = Arc::new(CountingAdapter::new("", flags(IntegrationMode::Direct)));
    assert!(registry.register_service("  ", adapter).is_err());
}

#[tokio::test]
async fn test_instance_is_reused() {
    let (registry, adapter) = setup(
        "weather",
        CountingAdapter::new("weather", flags(IntegrationMode::Direct)),
    );

    let first = registry.get_service("weather").await.unwrap();
    let second = registry.get_service("weather").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(adapter.constructions(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_callers_construct_once() {
    let (registry, adapter) = setup(
        "weather",
        CountingAdapter::new("weather", flags(IntegrationMode::Direct))
            .with_delay(Duration::from_millis(30)),
    );
    let registry = Arc::new(registry);

    let callers: Vec<_> = (0..12)
        .map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.get_service("weather").await.unwrap() })
        })
        .collect();

    let mut instances = Vec::new();
    for caller in callers {
        instances.push(caller.await.unwrap());
    }

    assert_eq!(adapter.constructions(), 1);
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_services_construct_in_parallel() {
    let registry = Arc::new(ServiceRegistry::new());
    let shared = flags(IntegrationMode::Direct);
    for name in ["a", "b", "c"] {
        let adapter = CountingAdapter::new(name, Arc::clone(&shared))
            .with_delay(Duration::from_millis(100));
        registry.register_service(name, Arc::new(adapter)).unwrap();
    }

    let started = std::time::Instant::now();
    let calls: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.get_service(name).await.unwrap() })
        })
        .collect();
    for call in calls {
        call.await.unwrap();
    }

    // serialized construction would take at least 300ms
    assert!(started.elapsed() < Duration::from_millis(250));
}

#[tokio::test]
async fn test_mode_switch_takes_effect_on_refresh() {
    let shared = flags(IntegrationMode::Mcp);
    let (registry, adapter) = setup("cache", CountingAdapter::new("cache", Arc::clone(&shared)));

    let before = registry.get_typed::<CountingService>("cache").await.unwrap();
    assert_eq!(before.mode, IntegrationMode::Mcp);

    shared.set_mode("cache", IntegrationMode::Direct);
    // resolved instances are untouched until refreshed
    let still = registry.get_typed::<CountingService>("cache").await.unwrap();
    assert!(Arc::ptr_eq(&before, &still));

    registry.refresh_service("cache").await.unwrap();
    let after = registry.get_typed::<CountingService>("cache").await.unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.mode, IntegrationMode::Direct);
    assert_eq!(before.closes.load(Ordering::SeqCst), 1);
    assert_eq!(after.closes.load(Ordering::SeqCst), 0);
    assert_eq!(adapter.constructions(), 2);
}

#[tokio::test]
async fn test_refresh_ignores_close_failures() {
    let (registry, _adapter) = setup(
        "flaky",
        CountingAdapter::new("flaky", flags(IntegrationMode::Direct)).with_failing_close(),
    );

    let before = registry.get_typed::<CountingService>("flaky").await.unwrap();
    let after = registry.refresh_service("flaky").await.unwrap();

    assert_eq!(before.closes.load(Ordering::SeqCst), 1);
    assert_eq!(after.implementation(), "counting-direct");
}

#[tokio::test]
async fn test_construction_failure_surfaces_connect_error() {
    let (registry, adapter) = setup(
        "weather",
        CountingAdapter::new("weather", flags(IntegrationMode::Direct)),
    );
    adapter.set_failing(true);

    let err = registry.get_service("weather").await.unwrap_err();
    assert!(matches!(err, Error::Connect { .. }));
    assert!(!registry.list_services()["weather"].is_connected);

    adapter.set_failing(false);
    assert!(registry.get_service("weather").await.is_ok());
}

#[tokio::test]
async fn test_reregistering_keeps_existing_instance() {
    let shared = flags(IntegrationMode::Direct);
    let (registry, first_adapter) =
        setup("svc", CountingAdapter::new("svc", Arc::clone(&shared)));
    let original = registry.get_service("svc").await.unwrap();

    let replacement = Arc::new(CountingAdapter::new("svc", Arc::clone(&shared)));
    registry
        .register_service("svc", replacement.clone())
        .unwrap();

    let same = registry.get_service("svc").await.unwrap();
    assert!(Arc::ptr_eq(&original, &same));
    assert_eq!(replacement.constructions(), 0);

    registry.refresh_service("svc").await.unwrap();
    assert_eq!(first_adapter.constructions(), 1);
    assert_eq!(replacement.constructions(), 1);
}

#[tokio::test]
async fn test_close_all_is_best_effort() {
    let registry = ServiceRegistry::new();
    let shared = flags(IntegrationMode::Direct);
    let good = Arc::new(CountingAdapter::new("good", Arc::clone(&shared)));
    let bad = Arc::new(CountingAdapter::new("bad", Arc::clone(&shared)).with_failing_close());
    let idle = Arc::new(CountingAdapter::new("idle", Arc::clone(&shared)));
    registry.register_service("good", good.clone()).unwrap();
    registry.register_service("bad", bad.clone()).unwrap();
    registry.register_service("idle", idle.clone()).unwrap();

    let good_instance = registry.get_typed::<CountingService>("good").await.unwrap();
    let bad_instance = registry.get_typed::<CountingService>("bad").await.unwrap();

    let err = registry.close_all().await.unwrap_err();
    assert!(err.to_string().contains("bad"));
    assert_eq!(good_instance.closes.load(Ordering::SeqCst), 1);
    assert_eq!(bad_instance.closes.load(Ordering::SeqCst), 1);

    // adapters stay registered; instances are gone
    let statuses = registry.list_services();
    assert_eq!(statuses.len(), 3);
    assert!(statuses.values().all(|s| !s.is_connected));

    let rebuilt = registry.get_service("good").await.unwrap();
    assert_eq!(rebuilt.implementation(), "counting-direct");
    assert_eq!(good.constructions(), 2);
    assert_eq!(idle.constructions(), 0);
}

#[tokio::test]
async fn test_list_services_never_constructs() {
    let shared = flags(IntegrationMode::Mcp);
    let (registry, adapter) = setup("cache", CountingAdapter::new("cache", Arc::clone(&shared)));

    let statuses = registry.list_services();
    let status = &statuses["cache"];
    assert_eq!(status.name, "cache");
    assert_eq!(status.integration_mode, IntegrationMode::Mcp);
    assert!(!status.is_connected);
    assert_eq!(status.adapter_type, "CountingAdapter");
    assert_eq!(adapter.constructions(), 0);

    registry.get_service("cache").await.unwrap();
    shared.set_mode("cache", IntegrationMode::Direct);
    let statuses = registry.list_services();
    let status = &statuses["cache"];
    assert!(status.is_connected);
    assert_eq!(status.integration_mode, IntegrationMode::Direct);
}

#[tokio::test]
async fn test_get_typed_rejects_wrong_type() {
    let (registry, _adapter) = setup(
        "weather",
        CountingAdapter::new("weather", flags(IntegrationMode::Direct)),
    );
    let err = registry
        .get_typed::<waypoint_infrastructure::CacheClient>("weather")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("counting-direct"));
}
