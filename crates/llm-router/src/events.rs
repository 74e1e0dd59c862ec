//! Events reported by router components.
//!
//! Subscribed through the router builder's `on_*_event` hooks; see
//! [`llm_router_core::events::Listeners`] for delivery semantics.

use std::time::Duration;

/// Events from the retry controller.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// A failed attempt will be retried after `delay`.
    Retry { attempt: u32, delay: Duration },
    /// The call succeeded after `attempts` attempts.
    Success { attempts: u32 },
    /// The attempt budget is exhausted.
    Exhausted { attempts: u32 },
    /// An error was not retryable and is surfaced unchanged.
    IgnoredError,
}

/// Events from the provider status manager.
#[derive(Debug, Clone)]
pub enum ProviderStatusEvent {
    /// A failure advanced the provider's per-minute fail counter.
    FailureCounted { provider_id: String, fails: u32, allowed: u32 },
    /// A provider entered cooldown.
    CooldownAdded { provider_id: String, error_name: &'static str, cooldown: Duration },
}

/// Events from the shared cache.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A bucket was still full after sweeping; the write proceeded anyway.
    BucketFull { bucket: usize },
    /// A periodic sweep finished.
    SweepCompleted { evicted: usize },
}
