use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use llm_router::cache::{CacheSettings, CacheValue, MemoryCache};

#[tokio::test]
async fn the_periodic_sweep_evicts_expired_entries() {
    let cache = Arc::new(MemoryCache::new(CacheSettings {
        cleanup_interval: Duration::from_millis(30),
        ..CacheSettings::default()
    }));
    cache
        .set("stale", CacheValue::Counter(1), Some(Duration::from_millis(10)))
        .await;
    cache.set("fresh", CacheValue::Counter(2), None).await;

    cache.start_sweeper();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The stale entry was removed by the sweep, not by a read.
    assert_eq!(cache.evict_expired().await, 0);
    assert!(cache.get("fresh").await.is_some());
    cache.shutdown();
}

#[tokio::test]
async fn sweep_hooks_run_on_every_tick() {
    let cache = Arc::new(MemoryCache::new(CacheSettings {
        cleanup_interval: Duration::from_millis(20),
        ..CacheSettings::default()
    }));
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_clone = Arc::clone(&runs);
    cache.add_sweep_hook(Arc::new(move || {
        runs_clone.fetch_add(1, Ordering::SeqCst);
    }));

    cache.start_sweeper();
    tokio::time::sleep(Duration::from_millis(110)).await;
    cache.shutdown();

    let observed = runs.load(Ordering::SeqCst);
    assert!(observed >= 3, "expected several sweep ticks, saw {observed}");
}

#[tokio::test]
async fn shutdown_stops_the_sweeper() {
    let cache = Arc::new(MemoryCache::new(CacheSettings {
        cleanup_interval: Duration::from_millis(10),
        ..CacheSettings::default()
    }));
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_clone = Arc::clone(&runs);
    cache.add_sweep_hook(Arc::new(move || {
        runs_clone.fetch_add(1, Ordering::SeqCst);
    }));

    cache.start_sweeper();
    tokio::time::sleep(Duration::from_millis(50)).await;
    cache.shutdown();
    // Let any in-flight tick finish before taking the baseline.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let after_shutdown = runs.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(runs.load(Ordering::SeqCst), after_shutdown);
}
