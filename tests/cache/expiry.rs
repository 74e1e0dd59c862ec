use std::time::Duration;

use llm_router::cache::{CacheSettings, CacheValue, MemoryCache};

fn cache() -> MemoryCache {
    MemoryCache::new(CacheSettings::default())
}

#[tokio::test]
async fn a_value_is_readable_until_its_deadline() {
    let cache = cache();
    cache
        .set("k", CacheValue::Counter(1), Some(Duration::from_millis(80)))
        .await;
    assert!(cache.get("k").await.is_some());

    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(cache.get("k").await.is_none());
}

#[tokio::test]
async fn per_key_ttls_are_independent() {
    let cache = cache();
    cache
        .set("short", CacheValue::Counter(1), Some(Duration::from_millis(30)))
        .await;
    cache
        .set("long", CacheValue::Counter(2), Some(Duration::from_secs(60)))
        .await;

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(cache.get("short").await.is_none());
    assert!(cache.get("long").await.is_some());
}

#[tokio::test]
async fn the_default_ttl_applies_when_none_is_given() {
    let cache = MemoryCache::new(CacheSettings {
        default_ttl: Duration::from_millis(30),
        ..CacheSettings::default()
    });
    cache.set("k", CacheValue::Counter(1), None).await;
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(cache.get("k").await.is_none());
}

#[tokio::test]
async fn values_round_trip_by_variant() {
    let cache = cache();
    cache
        .set(
            "usage",
            CacheValue::Usage(llm_router::usage::UsageRecord { used: 3, occupying: 2 }),
            None,
        )
        .await;
    let usage = cache.get("usage").await.unwrap().as_usage().unwrap();
    assert_eq!(usage.total(), 5);

    cache.set("counter", CacheValue::Counter(9), None).await;
    assert_eq!(cache.get("counter").await.unwrap().as_counter(), Some(9));
}
