//! Per-minute RPM/TPM accounting.
//!
//! For each `(dimension, group, provider, minute)` the manager tracks how
//! much capacity is reserved but unconfirmed (`occupying`) and how much is
//! confirmed (`used`); their sum is what the balancers compare against a
//! provider's configured ceiling.
//!
//! The attempt lifecycle is reserve → invoke → (confirm on success | release
//! on failure), driven through [`ReservationGuard`] so that a cancelled
//! attempt still releases what it reserved.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{CacheValue, MemoryCache};
use crate::context::RequestContext;
use crate::locks::NamedLocks;

/// Records live for a day; only the current minute's record is ever read.
const USAGE_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// Stale usage locks are purged once their minute falls out of the record
/// retention window.
pub(crate) const USAGE_LOCK_RETENTION: Duration = USAGE_TTL;

/// A capacity dimension tracked per minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Rpm,
    Tpm,
}

impl Dimension {
    fn as_str(self) -> &'static str {
        match self {
            Dimension::Rpm => "rpm",
            Dimension::Tpm => "tpm",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usage within one minute bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub used: u64,
    pub occupying: u64,
}

impl UsageRecord {
    pub fn total(&self) -> u64 {
        self.used + self.occupying
    }
}

/// Tracks RPM and TPM consumption per `(group, provider, minute)`.
///
/// Mutations serialize on a named lock per record key, so concurrent
/// reservations and confirmations on the same key never tear a record.
pub struct RpmTpmManager {
    cache: Arc<MemoryCache>,
    locks: NamedLocks,
}

impl RpmTpmManager {
    pub fn new(cache: Arc<MemoryCache>) -> Self {
        Self { cache, locks: NamedLocks::new() }
    }

    fn build_key(dimension: Dimension, group: &str, provider_id: &str, minute: &str) -> String {
        format!("{dimension}:{group}:{provider_id}:{minute}")
    }

    /// Adds `amount` to the reserved-but-unconfirmed capacity for the
    /// context's minute.
    pub async fn reserve(
        &self,
        ctx: &RequestContext,
        dimension: Dimension,
        group: &str,
        provider_id: &str,
        amount: u64,
    ) {
        self.reserve_at(dimension, group, provider_id, &ctx.start_minute(), amount)
            .await;
    }

    async fn reserve_at(
        &self,
        dimension: Dimension,
        group: &str,
        provider_id: &str,
        minute: &str,
        amount: u64,
    ) {
        let key = Self::build_key(dimension, group, provider_id, minute);
        let lock = self.locks.lock_for(&key);
        let _guard = lock.lock().await;
        let mut usage = self
            .cache
            .get(&key)
            .await
            .and_then(|v| v.as_usage())
            .unwrap_or_default();
        usage.occupying += amount;
        self.cache.set(&key, CacheValue::Usage(usage), Some(USAGE_TTL)).await;
    }

    /// Moves `amount` from `occupying` to `used` after a successful call.
    /// Logs and no-ops when no record exists.
    pub async fn confirm(
        &self,
        ctx: &RequestContext,
        dimension: Dimension,
        group: &str,
        provider_id: &str,
        amount: u64,
    ) {
        self.confirm_at(dimension, group, provider_id, &ctx.start_minute(), amount)
            .await;
    }

    async fn confirm_at(
        &self,
        dimension: Dimension,
        group: &str,
        provider_id: &str,
        minute: &str,
        amount: u64,
    ) {
        let key = Self::build_key(dimension, group, provider_id, minute);
        let lock = self.locks.lock_for(&key);
        let _guard = lock.lock().await;
        let Some(mut usage) = self.cache.get(&key).await.and_then(|v| v.as_usage()) else {
            warn!(%key, "no usage record to confirm");
            return;
        };
        usage.used += amount;
        usage.occupying = usage.occupying.saturating_sub(amount);
        self.cache.set(&key, CacheValue::Usage(usage), Some(USAGE_TTL)).await;
    }

    /// Gives back `amount` of reserved capacity after a failed call. Logs
    /// and no-ops when no record exists.
    pub async fn release(
        &self,
        ctx: &RequestContext,
        dimension: Dimension,
        group: &str,
        provider_id: &str,
        amount: u64,
    ) {
        self.release_at(dimension, group, provider_id, &ctx.start_minute(), amount)
            .await;
    }

    async fn release_at(
        &self,
        dimension: Dimension,
        group: &str,
        provider_id: &str,
        minute: &str,
        amount: u64,
    ) {
        let key = Self::build_key(dimension, group, provider_id, minute);
        let lock = self.locks.lock_for(&key);
        let _guard = lock.lock().await;
        let Some(mut usage) = self.cache.get(&key).await.and_then(|v| v.as_usage()) else {
            warn!(%key, "no usage record to release");
            return;
        };
        usage.occupying = usage.occupying.saturating_sub(amount);
        self.cache.set(&key, CacheValue::Usage(usage), Some(USAGE_TTL)).await;
    }

    /// Total (`used + occupying`) for the context's minute, 0 if absent.
    pub async fn usage(
        &self,
        ctx: &RequestContext,
        dimension: Dimension,
        group: &str,
        provider_id: &str,
    ) -> u64 {
        let key = Self::build_key(dimension, group, provider_id, &ctx.start_minute());
        let lock = self.locks.lock_for(&key);
        let _guard = lock.lock().await;
        match self.cache.get(&key).await.and_then(|v| v.as_usage()) {
            Some(usage) => usage.total(),
            None => {
                debug!(%key, "no usage record");
                0
            }
        }
    }

    /// Reserves one request and the context's token count against the
    /// scheduled provider, returning a guard that must be confirmed or
    /// released.
    pub async fn begin_attempt(
        self: &Arc<Self>,
        ctx: &RequestContext,
        group: &str,
        provider_id: &str,
    ) -> ReservationGuard {
        let minute = ctx.start_minute();
        let tokens = ctx.token_count();
        self.reserve_at(Dimension::Rpm, group, provider_id, &minute, 1).await;
        self.reserve_at(Dimension::Tpm, group, provider_id, &minute, tokens).await;
        ReservationGuard {
            manager: Arc::clone(self),
            group: group.to_string(),
            provider_id: provider_id.to_string(),
            minute,
            tokens,
            armed: true,
        }
    }

    /// Drops named locks for minutes outside the retention window.
    pub(crate) fn purge_stale_locks(&self) {
        self.locks.purge_stale(USAGE_LOCK_RETENTION);
    }

    #[cfg(test)]
    pub(crate) fn lock_count(&self) -> usize {
        self.locks.len()
    }
}

/// An in-flight attempt's RPM/TPM reservation.
///
/// Exactly one of [`confirm`](Self::confirm) or [`release`](Self::release)
/// ends the reservation. If the guard is dropped while still armed (the
/// attempt future was cancelled), the release is spawned onto the runtime so
/// the reserved capacity is not leaked.
#[must_use = "a reservation must be confirmed or released"]
pub struct ReservationGuard {
    manager: Arc<RpmTpmManager>,
    group: String,
    provider_id: String,
    minute: String,
    tokens: u64,
    armed: bool,
}

impl ReservationGuard {
    /// Marks the reserved capacity as used after a successful call.
    pub async fn confirm(mut self) {
        self.armed = false;
        self.manager
            .confirm_at(Dimension::Rpm, &self.group, &self.provider_id, &self.minute, 1)
            .await;
        self.manager
            .confirm_at(Dimension::Tpm, &self.group, &self.provider_id, &self.minute, self.tokens)
            .await;
    }

    /// Gives the reserved capacity back after a failed call.
    pub async fn release(mut self) {
        self.armed = false;
        self.manager
            .release_at(Dimension::Rpm, &self.group, &self.provider_id, &self.minute, 1)
            .await;
        self.manager
            .release_at(Dimension::Tpm, &self.group, &self.provider_id, &self.minute, self.tokens)
            .await;
    }
}

impl Drop for ReservationGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(provider_id = %self.provider_id, "reservation dropped outside a runtime");
            return;
        };
        let manager = Arc::clone(&self.manager);
        let group = std::mem::take(&mut self.group);
        let provider_id = std::mem::take(&mut self.provider_id);
        let minute = std::mem::take(&mut self.minute);
        let tokens = self.tokens;
        handle.spawn(async move {
            manager
                .release_at(Dimension::Rpm, &group, &provider_id, &minute, 1)
                .await;
            manager
                .release_at(Dimension::Tpm, &group, &provider_id, &minute, tokens)
                .await;
        });
    }
}
