//! Provider health: failure classification, allowed-fails counting, and
//! timed cooldown.
//!
//! Failures are classified per error:
//!
//! - critical (rate limit, authentication, not-found, or any status >= 500):
//!   cooldown unconditionally;
//! - temporary (request timeout): never cooldown, and the fail counter does
//!   not advance;
//! - everything else: count the failure against the per-minute allowance and
//!   cooldown once it is exceeded.
//!
//! Cooldown records outlive the cooldown itself (1 h TTL) so they stay
//! readable for metrics; whether a provider is excluded is decided by
//! [`CooldownState::is_expired`], not by the cache TTL.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use llm_router_core::events::Listeners;
use llm_router_core::{ErrorClass, RouterError};

use crate::cache::{CacheValue, MemoryCache};
use crate::config::{AllowedFailsPolicy, CooldownConfig, ProviderGroups};
use crate::context::{current_minute, MINUTE_FORMAT};
use crate::events::ProviderStatusEvent;
use crate::locks::NamedLocks;
use crate::provider::ProviderConfig;

/// Cooldown and fail-counter records are kept for an hour.
const STATUS_TTL: Duration = Duration::from_secs(60 * 60);

pub(crate) const STATUS_LOCK_RETENTION: Duration = STATUS_TTL;

/// A provider's cooldown window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CooldownState {
    pub exception_name: String,
    pub timestamp: DateTime<Local>,
    pub cooldown_seconds: u64,
}

impl CooldownState {
    pub fn is_expired(&self) -> bool {
        Local::now() > self.timestamp + chrono::Duration::seconds(self.cooldown_seconds as i64)
    }
}

enum Classification {
    /// Cooldown no matter what the counters say.
    Critical,
    /// Never cooldown; the fail counter does not advance either.
    Temporary,
    /// Count against the allowed-fails allowance.
    Countable,
}

/// Tracks per-provider health and answers which providers may be scheduled.
pub struct ProviderStatusManager {
    cache: Arc<MemoryCache>,
    provider_groups: ProviderGroups,
    cooldown_seconds: u64,
    general_allowed_fails: u32,
    allowed_fails_policy: AllowedFailsPolicy,
    locks: NamedLocks,
    listeners: Listeners<ProviderStatusEvent>,
}

impl ProviderStatusManager {
    pub fn new(
        cache: Arc<MemoryCache>,
        provider_groups: ProviderGroups,
        cooldown: CooldownConfig,
        listeners: Listeners<ProviderStatusEvent>,
    ) -> Self {
        Self {
            cache,
            provider_groups,
            cooldown_seconds: cooldown.cooldown_seconds,
            general_allowed_fails: cooldown.general_allowed_fails,
            allowed_fails_policy: cooldown.allowed_fails_policy,
            locks: NamedLocks::new(),
            listeners,
        }
    }

    /// The group's providers that are not currently in cooldown.
    pub async fn available_providers(
        &self,
        group: &str,
    ) -> Result<Vec<ProviderConfig>, RouterError> {
        let providers = self
            .provider_groups
            .get(group)
            .ok_or_else(|| RouterError::ModelGroupNotFound { group: group.to_string() })?;

        let mut available = Vec::with_capacity(providers.len());
        for p in providers {
            if !self.is_in_cooldown(p.id()).await {
                available.push(p.clone());
            }
        }
        debug!(group, available = available.len(), total = providers.len(), "healthy providers");
        Ok(available)
    }

    /// Classifies a provider failure and promotes the provider to cooldown
    /// when warranted.
    pub async fn record_failure(&self, provider_id: &str, error: &RouterError) {
        let should_cooldown = match Self::classify(error) {
            Classification::Critical => true,
            Classification::Temporary => false,
            Classification::Countable => self.count_failure(provider_id, error).await,
        };
        if should_cooldown {
            self.add_cooldown(provider_id, error).await;
        }
    }

    fn classify(error: &RouterError) -> Classification {
        match error.class() {
            ErrorClass::RateLimit | ErrorClass::Authentication | ErrorClass::NotFound => {
                Classification::Critical
            }
            ErrorClass::Timeout => Classification::Temporary,
            _ => match error.status_code() {
                Some(status) if status >= 500 => Classification::Critical,
                _ => Classification::Countable,
            },
        }
    }

    /// Atomically bumps the per-minute fail counter; returns true once the
    /// allowance is exceeded. The counter is only persisted while the
    /// provider stays under the allowance.
    async fn count_failure(&self, provider_id: &str, error: &RouterError) -> bool {
        let allowed = self.allowed_fails_for(error);
        let key = format!("failed_calls:{provider_id}:{}", current_minute());
        let lock = self.locks.lock_for(&key);
        let _guard = lock.lock().await;

        let current = self
            .cache
            .get(&key)
            .await
            .and_then(|v| v.as_counter())
            .unwrap_or(0) as u32;
        let updated = current + 1;
        if updated > allowed {
            return true;
        }
        self.cache
            .set(&key, CacheValue::Counter(updated as u64), Some(STATUS_TTL))
            .await;
        self.listeners.notify(&ProviderStatusEvent::FailureCounted {
            provider_id: provider_id.to_string(),
            fails: updated,
            allowed,
        });
        false
    }

    fn allowed_fails_for(&self, error: &RouterError) -> u32 {
        let policy = &self.allowed_fails_policy;
        let class_specific = match error.class() {
            ErrorClass::BadRequest => policy.bad_request_allowed_fails,
            ErrorClass::Authentication => policy.authentication_allowed_fails,
            ErrorClass::Timeout => policy.timeout_allowed_fails,
            ErrorClass::RateLimit => policy.rate_limit_allowed_fails,
            ErrorClass::ContentPolicyViolation => policy.content_policy_violation_allowed_fails,
            _ => None,
        };
        class_specific.unwrap_or(self.general_allowed_fails)
    }

    async fn add_cooldown(&self, provider_id: &str, error: &RouterError) {
        let key = format!("cooldown:{provider_id}:{}", current_minute());
        let state = CooldownState {
            exception_name: error.name().to_string(),
            timestamp: Local::now(),
            cooldown_seconds: self.cooldown_seconds,
        };
        self.cache
            .set(&key, CacheValue::Cooldown(state), Some(STATUS_TTL))
            .await;
        info!(provider_id, error = error.name(), "provider added to cooldown");
        self.listeners.notify(&ProviderStatusEvent::CooldownAdded {
            provider_id: provider_id.to_string(),
            error_name: error.name(),
            cooldown: Duration::from_secs(self.cooldown_seconds),
        });
        #[cfg(feature = "metrics")]
        metrics::counter!(
            "llm_router_provider_cooldowns_total",
            "error" => error.name()
        )
        .increment(1);
    }

    /// Whether the provider has a live cooldown record.
    ///
    /// Records are keyed by the minute the failure occurred, so the check
    /// scans back far enough to see a cooldown that spans minute
    /// boundaries; expiry itself is decided by the record's own window.
    async fn is_in_cooldown(&self, provider_id: &str) -> bool {
        let minutes_back = (self.cooldown_seconds / 60 + 1).min(60);
        let now = Local::now();
        for offset in 0..=minutes_back {
            let minute = (now - chrono::Duration::minutes(offset as i64))
                .format(MINUTE_FORMAT)
                .to_string();
            let key = format!("cooldown:{provider_id}:{minute}");
            if let Some(state) = self.cache.get(&key).await.and_then(|v| match v {
                CacheValue::Cooldown(c) => Some(c),
                _ => None,
            }) {
                if !state.is_expired() {
                    return true;
                }
            }
        }
        false
    }

    /// Drops named locks for minutes outside the retention window.
    pub(crate) fn purge_stale_locks(&self) {
        self.locks.purge_stale(STATUS_LOCK_RETENTION);
    }
}
