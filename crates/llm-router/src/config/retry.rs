use serde::Serialize;

/// Per-error-class retry caps layered under the global `max_attempt`.
///
/// An unset field leaves that class governed by the global cap alone; a set
/// field stops the attempt loop at `min(class_cap, max_attempt)`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RetryPolicy {
    pub bad_request_retries: Option<u32>,
    pub authentication_retries: Option<u32>,
    pub timeout_retries: Option<u32>,
    pub rate_limit_retries: Option<u32>,
    pub content_policy_violation_retries: Option<u32>,
    pub internal_server_retries: Option<u32>,
}

/// Retry budget for one routed call.
#[derive(Debug, Clone, Serialize)]
pub struct RetryConfig {
    /// Global cap on attempts, including the first. Must be at least 1.
    pub max_attempt: u32,
    pub retry_policy: Option<RetryPolicy>,
}

impl RetryConfig {
    /// A budget of exactly one attempt, used for fallback dispatch.
    pub fn single_attempt() -> Self {
        Self { max_attempt: 1, retry_policy: None }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempt: 3, retry_policy: None }
    }
}
