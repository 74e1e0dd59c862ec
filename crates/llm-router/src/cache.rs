//! Bucketed TTL cache shared by the usage and status managers.
//!
//! Keys are sharded over a fixed number of buckets by hash; every operation
//! on a key takes only that bucket's lock. Beyond bucket serialization there
//! is no cross-key guarantee: callers that need read-modify-write atomicity
//! take their own named lock (see [`crate::locks`]) keyed by the same
//! string.
//!
//! A full bucket degrades gracefully: the write sweeps expired entries and
//! then proceeds even if the bucket is still at capacity. Admission is never
//! refused.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use llm_router_core::events::Listeners;

use crate::events::CacheEvent;
use crate::status::CooldownState;
use crate::usage::UsageRecord;

/// A value stored in the shared cache.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Usage(UsageRecord),
    Cooldown(CooldownState),
    Counter(u64),
}

impl CacheValue {
    pub fn as_usage(&self) -> Option<UsageRecord> {
        match self {
            CacheValue::Usage(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_cooldown(&self) -> Option<&CooldownState> {
        match self {
            CacheValue::Cooldown(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_counter(&self) -> Option<u64> {
        match self {
            CacheValue::Counter(n) => Some(*n),
            _ => None,
        }
    }
}

/// Sizing and timing knobs for [`MemoryCache`].
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Total entry budget across all buckets; each bucket gets an equal
    /// share.
    pub max_size_in_memory: usize,
    pub default_ttl: Duration,
    pub cleanup_interval: Duration,
    pub num_buckets: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            // Room for ~10 kinds of keys times 64 providers over an hour of
            // minute buckets.
            max_size_in_memory: 10 * 64 * 60,
            default_ttl: Duration::from_secs(60 * 60),
            cleanup_interval: Duration::from_secs(60 * 5),
            num_buckets: 64,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: CacheValue,
    deadline: Instant,
}

type SweepHook = Arc<dyn Fn() + Send + Sync>;

/// Process-local key-value store with per-entry expiry and a periodic sweep.
pub struct MemoryCache {
    buckets: Vec<Mutex<HashMap<String, Entry>>>,
    max_per_bucket: usize,
    default_ttl: Duration,
    cleanup_interval: Duration,
    listeners: Listeners<CacheEvent>,
    sweep_hooks: StdMutex<Vec<SweepHook>>,
    sweeper: StdMutex<Option<JoinHandle<()>>>,
}

impl MemoryCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self::with_listeners(settings, Listeners::new())
    }

    pub fn with_listeners(settings: CacheSettings, listeners: Listeners<CacheEvent>) -> Self {
        let num_buckets = settings.num_buckets.max(1);
        Self {
            buckets: (0..num_buckets).map(|_| Mutex::new(HashMap::new())).collect(),
            max_per_bucket: (settings.max_size_in_memory / num_buckets).max(1),
            default_ttl: settings.default_ttl,
            cleanup_interval: settings.cleanup_interval,
            listeners,
            sweep_hooks: StdMutex::new(Vec::new()),
            sweeper: StdMutex::new(None),
        }
    }

    fn bucket_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.buckets.len()
    }

    /// Writes `value` under `key` with `ttl` (or the default TTL).
    pub async fn set(&self, key: &str, value: CacheValue, ttl: Option<Duration>) {
        let idx = self.bucket_index(key);
        let mut bucket = self.buckets[idx].lock().await;
        if bucket.len() >= self.max_per_bucket {
            Self::clean_bucket(&mut bucket);
            if bucket.len() >= self.max_per_bucket {
                warn!(bucket = idx, "cache bucket is full");
                self.listeners.notify(&CacheEvent::BucketFull { bucket: idx });
                #[cfg(feature = "metrics")]
                metrics::counter!("llm_router_cache_bucket_full_total").increment(1);
            }
        }
        let deadline = Instant::now() + ttl.unwrap_or(self.default_ttl);
        bucket.insert(key.to_string(), Entry { value, deadline });
    }

    /// Reads the live value under `key`, evicting it first if expired.
    pub async fn get(&self, key: &str) -> Option<CacheValue> {
        let idx = self.bucket_index(key);
        let mut bucket = self.buckets[idx].lock().await;
        match bucket.get(key) {
            None => None,
            Some(entry) if entry.deadline <= Instant::now() => {
                bucket.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
        }
    }

    fn clean_bucket(bucket: &mut HashMap<String, Entry>) -> usize {
        let before = bucket.len();
        let now = Instant::now();
        bucket.retain(|_, entry| entry.deadline > now);
        before - bucket.len()
    }

    /// Walks every bucket and evicts expired entries. Returns how many were
    /// dropped.
    pub async fn evict_expired(&self) -> usize {
        let mut evicted = 0;
        for bucket in &self.buckets {
            let mut bucket = bucket.lock().await;
            evicted += Self::clean_bucket(&mut bucket);
        }
        evicted
    }

    /// Registers a hook to run after every periodic sweep.
    pub fn add_sweep_hook(&self, hook: SweepHook) {
        self.sweep_hooks.lock().expect("sweep hook lock poisoned").push(hook);
    }

    /// Starts the periodic sweep task if it is not already running.
    ///
    /// The task holds only a weak reference, so dropping the cache stops the
    /// sweep on its next tick; [`MemoryCache::shutdown`] stops it
    /// immediately.
    pub fn start_sweeper(self: &Arc<Self>) {
        let mut sweeper = self.sweeper.lock().expect("sweeper lock poisoned");
        if sweeper.is_some() {
            return;
        }
        let cache: Weak<MemoryCache> = Arc::downgrade(self);
        let interval = self.cleanup_interval;
        *sweeper = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(cache) = cache.upgrade() else { break };
                let evicted = cache.evict_expired().await;
                let hooks: Vec<SweepHook> =
                    cache.sweep_hooks.lock().expect("sweep hook lock poisoned").clone();
                for hook in hooks {
                    hook();
                }
                debug!(evicted, "cache sweep completed");
                cache.listeners.notify(&CacheEvent::SweepCompleted { evicted });
                #[cfg(feature = "metrics")]
                metrics::counter!("llm_router_cache_swept_entries_total")
                    .increment(evicted as u64);
            }
        }));
    }

    /// Cancels the periodic sweep. In-flight cache operations complete.
    pub fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().expect("sweeper lock poisoned").take() {
            handle.abort();
        }
    }
}

impl Drop for MemoryCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
