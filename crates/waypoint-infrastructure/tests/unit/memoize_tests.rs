//! Memoization tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};
use waypoint_domain::error::Result;
use waypoint_domain::value_objects::ContentType;
use waypoint_infrastructure::cache::{
    CacheSource, MemoArgs, MemoizeOptions, Memoizer, memoize,
};
use waypoint_infrastructure::registry::ServiceRegistry;

use crate::support::memory_client;

fn counting_lookup(
    calls: &Arc<AtomicUsize>,
) -> impl Fn(MemoArgs) -> std::pin::Pin<Box<dyn Future<Output = Result<Option<Value>>> + Send>>
{
    let calls = Arc::clone(calls);
    move |args: MemoArgs| {
        let calls = Arc::clone(&calls);
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(json!({ "echo": args.positional })))
        })
    }
}

#[tokio::test]
async fn test_second_call_hits_cache() {
    let cache = memory_client();
    let calls = Arc::new(AtomicUsize::new(0));
    let lookup = memoize(
        CacheSource::Client(cache.clone()),
        MemoizeOptions::new("lookup"),
        counting_lookup(&calls),
    );

    let args = MemoArgs::new().arg("Rome").kwarg("lang", "it");
    let first: Option<Value> = lookup.call(args.clone()).await.unwrap();
    let second: Option<Value> = lookup.call(args).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_skip_cache_forces_execution() {
    let cache = memory_client();
    let calls = Arc::new(AtomicUsize::new(0));
    let lookup = memoize(
        CacheSource::Client(cache),
        MemoizeOptions::new("lookup"),
        counting_lookup(&calls),
    );

    let args = MemoArgs::new().arg("Rome");
    let _: Option<Value> = lookup.call(args.clone()).await.unwrap();
    let _: Option<Value> = lookup.call_with(args.clone(), true).await.unwrap();
    let _: Option<Value> = lookup.call(args).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_none_and_null_results_are_not_cached() {
    let cache = memory_client();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let nothing = memoize(
        CacheSource::Client(cache.clone()),
        MemoizeOptions::new("nothing"),
        move |args: MemoArgs| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if args.positional.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Value::Null))
                }
            }
        },
    );

    let _: Option<Value> = nothing.call(MemoArgs::new()).await.unwrap();
    let _: Option<Value> = nothing.call(MemoArgs::new()).await.unwrap();
    let _: Option<Value> = nothing.call(MemoArgs::new().arg(1)).await.unwrap();
    let _: Option<Value> = nothing.call(MemoArgs::new().arg(1)).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(cache.keys("nothing:*").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_errors_propagate_and_are_not_cached() {
    let cache = memory_client();
    let failing = memoize(
        CacheSource::Client(cache.clone()),
        MemoizeOptions::new("failing"),
        |_args: MemoArgs| async {
            Err::<Option<Value>, _>(waypoint_domain::error::Error::internal("upstream down"))
        },
    );

    let result: Result<Option<Value>> = failing.call(MemoArgs::new().arg("x")).await;
    assert!(result.is_err());
    assert!(cache.keys("failing:*").await.unwrap().is_empty());
}

#[test]
fn test_key_ignores_keyword_order_and_skipped_args() {
    let memoizer = Memoizer::new(
        CacheSource::Client(memory_client()),
        MemoizeOptions::new("search").with_skip_args(1),
    );

    let a = MemoArgs::new()
        .arg("client-a")
        .arg("Rome")
        .kwarg("limit", 5)
        .kwarg("lang", "it");
    let b = MemoArgs::new()
        .arg("client-b")
        .arg("Rome")
        .kwarg("lang", "it")
        .kwarg("limit", 5);
    let c = MemoArgs::new().arg("client-a").arg("Paris");

    assert_eq!(memoizer.cache_key(&a), memoizer.cache_key(&b));
    assert_ne!(memoizer.cache_key(&a), memoizer.cache_key(&c));
    assert!(memoizer.cache_key(&a).starts_with("search:"));
}

#[test]
fn test_ttl_priority() {
    let source = CacheSource::Client(memory_client());
    let args = MemoArgs::new().arg("current weather in Rome");

    let classified = Memoizer::new(source.clone(), MemoizeOptions::new("p"));
    assert_eq!(classified.ttl_for(&args), ContentType::Realtime.ttl());

    let typed = Memoizer::new(
        source.clone(),
        MemoizeOptions::new("p").with_content_type(ContentType::Static),
    );
    assert_eq!(typed.ttl_for(&args), ContentType::Static.ttl());

    let overridden = Memoizer::new(
        source,
        MemoizeOptions::new("p")
            .with_content_type(ContentType::Static)
            .with_ttl(Duration::from_secs(7)),
    );
    assert_eq!(overridden.ttl_for(&args), Duration::from_secs(7));
}

#[test]
fn test_domain_kwargs_drive_classification() {
    let memoizer = Memoizer::new(
        CacheSource::Client(memory_client()),
        MemoizeOptions::new("p"),
    );

    let args = MemoArgs::new()
        .arg("Rome travel guide")
        .kwarg("domains", json!(["wikipedia.org"]));
    assert_eq!(memoizer.ttl_for(&args), ContentType::Static.ttl());

    let plain = MemoArgs::new().arg("Rome travel guide");
    assert_eq!(memoizer.ttl_for(&plain), ContentType::Daily.ttl());
}

#[tokio::test]
async fn test_stored_ttl_matches_content_type() {
    let cache = memory_client();
    let memoizer = Memoizer::new(
        CacheSource::Client(cache.clone()),
        MemoizeOptions::new("weather"),
    );
    let args = MemoArgs::new().arg("current weather in Rome");

    let _: Option<String> = memoizer
        .get_or_compute(&args, false, || async { Ok(Some("sunny".to_string())) })
        .await
        .unwrap();

    let ttl = cache.ttl(&memoizer.cache_key(&args)).await;
    assert!((59..=60).contains(&ttl), "ttl was {ttl}");
}

#[tokio::test]
async fn test_invalidate_and_invalidate_all() {
    let cache = memory_client();
    let calls = Arc::new(AtomicUsize::new(0));
    let lookup = memoize(
        CacheSource::Client(cache.clone()),
        MemoizeOptions::new("lookup"),
        counting_lookup(&calls),
    );
    cache.set("other:key", "keep", None).await;

    let rome = MemoArgs::new().arg("Rome");
    let paris = MemoArgs::new().arg("Paris");
    let _: Option<Value> = lookup.call(rome.clone()).await.unwrap();
    let _: Option<Value> = lookup.call(paris.clone()).await.unwrap();

    assert!(lookup.invalidate(&rome).await.unwrap());
    assert!(!lookup.invalidate(&rome).await.unwrap());
    let _: Option<Value> = lookup.call(rome.clone()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    assert_eq!(lookup.invalidate_all().await.unwrap(), 2);
    assert_eq!(cache.get("other:key").await, Some("keep".to_string()));
    let _: Option<Value> = lookup.call(paris).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_unresolvable_cache_runs_uncached() {
    let source = CacheSource::Registry {
        registry: Arc::new(ServiceRegistry::new()),
        service: "cache".to_string(),
    };
    let calls = Arc::new(AtomicUsize::new(0));
    let lookup = memoize(source, MemoizeOptions::new("lookup"), counting_lookup(&calls));

    let args = MemoArgs::new().arg("Rome");
    let first: Option<Value> = lookup.call(args.clone()).await.unwrap();
    let _: Option<Value> = lookup.call(args.clone()).await.unwrap();

    assert!(first.is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(lookup.invalidate(&args).await.is_err());
}
