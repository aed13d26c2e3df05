//! Distributed lock tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use waypoint_domain::value_objects::LockToken;

use crate::support::{memory_client, memory_client_with_lock};

const TTL: Duration = Duration::from_secs(30);
const NO_DELAY: Duration = Duration::from_millis(1);

#[tokio::test]
async fn test_acquire_and_release() {
    let cache = memory_client();

    let lock = cache.acquire_lock("report", TTL, NO_DELAY, 0).await.unwrap();
    assert_eq!(lock.key, "waypoint:lock:report");
    assert!(cache.store().get(&lock.key).await.unwrap().is_some());

    assert!(cache.release_lock(&lock).await);
    assert!(cache.store().get(&lock.key).await.unwrap().is_none());
    assert!(!cache.release_lock(&lock).await);
}

#[tokio::test]
async fn test_busy_lock_is_not_acquired() {
    let cache = memory_client();

    let _held = cache.acquire_lock("report", TTL, NO_DELAY, 0).await.unwrap();
    assert!(cache.acquire_lock("report", TTL, NO_DELAY, 3).await.is_none());
}

#[tokio::test]
async fn test_foreign_token_cannot_release() {
    let cache = memory_client();

    let held = cache.acquire_lock("report", TTL, NO_DELAY, 0).await.unwrap();
    let forged = LockToken {
        key: held.key.clone(),
        token: "someone-else".to_string(),
    };

    assert!(!cache.release_lock(&forged).await);
    assert_eq!(
        cache.store().get(&held.key).await.unwrap(),
        Some(held.token.clone())
    );
    assert!(cache.release_lock(&held).await);
}

#[tokio::test]
async fn test_expired_holder_cannot_release_successor() {
    let cache = memory_client();

    let first = cache
        .acquire_lock("job", Duration::from_millis(30), NO_DELAY, 0)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    let second = cache.acquire_lock("job", TTL, NO_DELAY, 0).await.unwrap();
    assert!(!cache.release_lock(&first).await);
    assert_eq!(
        cache.store().get(&second.key).await.unwrap(),
        Some(second.token.clone())
    );
}

#[tokio::test]
async fn test_retry_acquires_after_release() {
    let cache = memory_client();

    let held = cache.acquire_lock("job", TTL, NO_DELAY, 0).await.unwrap();
    let releaser = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cache.release_lock(&held).await
        })
    };

    let acquired = cache
        .acquire_lock("job", TTL, Duration::from_millis(10), 50)
        .await;
    assert!(releaser.await.unwrap());
    assert!(acquired.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_exactly_one_concurrent_acquirer_wins() {
    let cache = memory_client();

    let attempts: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.acquire_lock("x", TTL, NO_DELAY, 0).await })
        })
        .collect();

    let mut winners = 0;
    for attempt in attempts {
        if attempt.await.unwrap().is_some() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn test_zero_ttl_uses_configured_ttl() {
    let cache = memory_client();

    let lock = cache
        .acquire_lock("job", Duration::ZERO, NO_DELAY, 0)
        .await
        .unwrap();
    let ttl = cache.ttl(&lock.key).await;
    assert!((29..=30).contains(&ttl), "ttl was {ttl}");
}

#[tokio::test]
async fn test_with_lock_guard() {
    let cache = memory_client_with_lock(0, 1);

    let guard = cache.with_lock("itinerary", None).await;
    assert!(guard.acquired());

    let contender = cache.with_lock("itinerary", None).await;
    assert!(!contender.acquired());
    assert!(!contender.release().await);

    assert!(guard.release().await);
    assert!(cache.with_lock("itinerary", None).await.acquired());
}

#[tokio::test]
async fn test_dropped_guard_releases() {
    let cache = memory_client_with_lock(0, 1);

    {
        let guard = cache.with_lock("itinerary", None).await;
        assert!(guard.acquired());
    }
    // the release runs on a spawned task
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(cache.exists(&["lock:itinerary"]).await, 0);
}

#[tokio::test]
async fn test_guard_released_when_critical_section_fails() {
    let cache = memory_client_with_lock(0, 1);

    async fn critical(cache: &waypoint_infrastructure::CacheClient) -> Result<(), String> {
        let _guard = cache.with_lock("fragile", None).await;
        Err("boom".to_string())
    }

    assert!(critical(&cache).await.is_err());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(cache.with_lock("fragile", None).await.acquired());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_locked_serializes_critical_sections() {
    let cache = memory_client_with_lock(200, 2);
    let inside = Arc::new(AtomicUsize::new(0));
    let max_inside = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let inside = Arc::clone(&inside);
            let max_inside = Arc::clone(&max_inside);
            tokio::spawn(async move {
                cache
                    .run_locked("section", None, || async {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().is_some());
    }
    assert_eq!(max_inside.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_run_locked_skips_when_busy() {
    let cache = memory_client_with_lock(0, 1);
    let _held = cache.acquire_lock_default("section").await.unwrap();

    let ran = cache.run_locked("section", None, || async { 42 }).await;
    assert_eq!(ran, None);
}
