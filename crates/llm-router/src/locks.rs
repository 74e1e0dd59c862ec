//! Named asynchronous locks.
//!
//! The usage and status managers serialize read-modify-write cycles on cache
//! entries by locking the entry's key, not the cache bucket. Locks are
//! created on demand; because keys embed the wall-clock minute, the map
//! grows continuously and must be purged of stale minutes periodically.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::context::MINUTE_FORMAT;

/// An on-demand map from string key to async mutex.
#[derive(Default)]
pub struct NamedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl NamedLocks {
    pub fn new() -> Self {
        Self { locks: DashMap::new() }
    }

    /// Returns the lock for `key`, creating it atomically if absent.
    pub fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops locks whose key's minute suffix is older than `retention`.
    ///
    /// A lock that is still referenced elsewhere (held or about to be held)
    /// is kept regardless of age.
    pub fn purge_stale(&self, retention: Duration) {
        let cutoff = Local::now().naive_local()
            - chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::zero());
        self.locks.retain(|key, lock| {
            if Arc::strong_count(lock) > 1 {
                return true;
            }
            match minute_of_key(key) {
                Some(minute) => minute >= cutoff,
                None => true,
            }
        });
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Parses the trailing `:YYYYMMDDhhmm` segment of a key.
fn minute_of_key(key: &str) -> Option<NaiveDateTime> {
    let suffix = key.rsplit(':').next()?;
    NaiveDateTime::parse_from_str(suffix, MINUTE_FORMAT).ok()
}
