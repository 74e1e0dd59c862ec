use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use llm_router::cache::{CacheSettings, CacheValue, MemoryCache};
use llm_router::events::CacheEvent;
use llm_router_core::events::Listeners;

/// An over-budget bucket warns but keeps admitting writes.
#[tokio::test]
async fn writes_are_never_refused() {
    let cache = MemoryCache::new(CacheSettings {
        max_size_in_memory: 4,
        num_buckets: 2,
        ..CacheSettings::default()
    });

    for i in 0..50u64 {
        cache.set(&format!("key-{i}"), CacheValue::Counter(i), None).await;
    }
    for i in 0..50u64 {
        assert_eq!(
            cache.get(&format!("key-{i}")).await.and_then(|v| v.as_counter()),
            Some(i),
            "key-{i} was dropped"
        );
    }
}

#[tokio::test]
async fn full_buckets_emit_an_event() {
    let fulls = Arc::new(AtomicUsize::new(0));
    let fulls_clone = Arc::clone(&fulls);
    let mut listeners = Listeners::new();
    listeners.subscribe(move |event: &CacheEvent| {
        if matches!(event, CacheEvent::BucketFull { .. }) {
            fulls_clone.fetch_add(1, Ordering::SeqCst);
        }
    });

    let cache = MemoryCache::with_listeners(
        CacheSettings { max_size_in_memory: 1, num_buckets: 1, ..CacheSettings::default() },
        listeners,
    );
    cache.set("a", CacheValue::Counter(1), None).await;
    cache.set("b", CacheValue::Counter(2), None).await;
    assert!(fulls.load(Ordering::SeqCst) >= 1);
}

/// Keys spread across buckets: concurrent writers on different keys make
/// progress without contending on one lock.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_on_distinct_keys() {
    let cache = Arc::new(MemoryCache::new(CacheSettings::default()));
    let mut handles = Vec::new();
    for i in 0..64u64 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            cache.set(&format!("key-{i}"), CacheValue::Counter(i), None).await;
            cache.get(&format!("key-{i}")).await
        }));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        let value = handle.await.unwrap();
        assert_eq!(value.and_then(|v| v.as_counter()), Some(i as u64));
    }
}
