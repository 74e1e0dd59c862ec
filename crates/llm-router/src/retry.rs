//! The retry controller: drives the attempt loop for one routed call.
//!
//! Three budgets govern the loop. Every failure, whatever its class, spends
//! from the global `max_attempt` budget. A per-class retry policy can cap a
//! class lower, at `min(class_cap, max_attempt)`. And the cumulative sleep
//! time is bounded by `max_delay`.
//!
//! Only retryable errors re-enter the loop; anything else surfaces
//! unchanged. When a budget runs out the last error is wrapped in
//! [`RouterError::RetryExhausted`], which is fallback-eligible.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use llm_router_core::events::Listeners;
use llm_router_core::{ErrorClass, RouterError};

use crate::config::RetryPolicy;
use crate::events::RetryEvent;

const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
const DEFAULT_FIX_WAIT: Duration = Duration::from_secs(1);
const BACKOFF_CAP_SECONDS: f64 = 10.0;

/// Policy-aware attempt loop around an async operation.
pub struct RetryController {
    max_attempt: u32,
    max_delay: Duration,
    retry_policy: Option<RetryPolicy>,
    fix_wait: Duration,
    multiplier: f64,
    listeners: Listeners<RetryEvent>,
}

impl RetryController {
    pub fn new(
        max_attempt: u32,
        retry_policy: Option<RetryPolicy>,
        listeners: Listeners<RetryEvent>,
    ) -> Self {
        Self {
            max_attempt,
            max_delay: DEFAULT_MAX_DELAY,
            retry_policy,
            fix_wait: DEFAULT_FIX_WAIT,
            multiplier: 1.0,
            listeners,
        }
    }

    /// Caps the cumulative time spent sleeping between attempts.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Sets the fixed wait applied to retryable failures other than rate
    /// limits.
    pub fn fix_wait(mut self, fix_wait: Duration) -> Self {
        self.fix_wait = fix_wait;
        self
    }

    /// Sets the multiplier of the rate-limit exponential backoff.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Runs `op` until it succeeds, fails terminally, or the budgets run
    /// out.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T, RouterError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RouterError>>,
    {
        let mut attempt: u32 = 0;
        let mut idle = Duration::ZERO;
        loop {
            attempt += 1;
            debug!(attempt, slept = ?idle, "starting attempt");
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(attempts = attempt, "call succeeded after retries");
                    } else {
                        debug!("call succeeded on first attempt");
                    }
                    self.listeners.notify(&RetryEvent::Success { attempts: attempt });
                    #[cfg(feature = "metrics")]
                    metrics::counter!("llm_router_retry_calls_total", "result" => "success")
                        .increment(1);
                    return Ok(value);
                }
                Err(error) => {
                    if !error.is_retryable() {
                        debug!(error = %error, "error not retryable, surfacing unchanged");
                        self.listeners.notify(&RetryEvent::IgnoredError);
                        return Err(error);
                    }
                    if self.should_stop(attempt, idle, &error) {
                        warn!(attempts = attempt, error = %error, "retry attempts exhausted");
                        self.listeners.notify(&RetryEvent::Exhausted { attempts: attempt });
                        #[cfg(feature = "metrics")]
                        metrics::counter!("llm_router_retry_calls_total", "result" => "exhausted")
                            .increment(1);
                        return Err(RouterError::RetryExhausted {
                            attempts: attempt,
                            last_error: Box::new(error),
                        });
                    }

                    let delay = self.wait_for(attempt, &error);
                    debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying after delay");
                    self.listeners.notify(&RetryEvent::Retry { attempt, delay });
                    #[cfg(feature = "metrics")]
                    metrics::counter!("llm_router_retry_attempts_total").increment(1);
                    tokio::time::sleep(delay).await;
                    idle += delay;
                }
            }
        }
    }

    fn should_stop(&self, attempt: u32, idle: Duration, error: &RouterError) -> bool {
        if attempt >= self.max_attempt {
            return true;
        }
        if idle >= self.max_delay {
            return true;
        }
        if matches!(error, RouterError::NoProviderAvailable { .. }) {
            return true;
        }
        if let Some(class_cap) = self.policy_cap(error) {
            return attempt >= class_cap.min(self.max_attempt);
        }
        false
    }

    fn policy_cap(&self, error: &RouterError) -> Option<u32> {
        let policy = self.retry_policy.as_ref()?;
        match error.class() {
            ErrorClass::BadRequest => policy.bad_request_retries,
            ErrorClass::Authentication => policy.authentication_retries,
            ErrorClass::Timeout => policy.timeout_retries,
            ErrorClass::RateLimit => policy.rate_limit_retries,
            ErrorClass::ContentPolicyViolation => policy.content_policy_violation_retries,
            ErrorClass::InternalServer => policy.internal_server_retries,
            _ => None,
        }
    }

    /// Rate limits back off exponentially (capped, with jitter); every other
    /// retryable failure waits a fixed interval.
    fn wait_for(&self, attempt: u32, error: &RouterError) -> Duration {
        match error {
            RouterError::RateLimit { .. } => {
                let backoff =
                    (self.multiplier * 2f64.powi(attempt as i32)).min(BACKOFF_CAP_SECONDS);
                let jitter: f64 = rand::rng().random();
                Duration::from_secs_f64(backoff + jitter)
            }
            _ => self.fix_wait,
        }
    }
}
