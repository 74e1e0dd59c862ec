//! Per-request context.
//!
//! One `RequestContext` is created per routed call and passed explicitly
//! through the pipeline. It carries the request identity, the pre-computed
//! token count, and the currently scheduled provider together with the
//! wall-clock instant the attempt started — which determines the minute
//! bucket every usage record for the call lands in.

use std::sync::Mutex;

use chrono::{DateTime, Local};
use uuid::Uuid;

/// Wall-clock minute bucket, formatted `YYYYMMDDhhmm`.
pub(crate) const MINUTE_FORMAT: &str = "%Y%m%d%H%M";

/// Returns the current minute bucket.
pub(crate) fn current_minute() -> String {
    Local::now().format(MINUTE_FORMAT).to_string()
}

#[derive(Debug, Clone)]
struct Scheduled {
    provider_id: Option<String>,
    start_time: DateTime<Local>,
}

/// Identity and scheduling state of one in-flight request.
#[derive(Debug)]
pub struct RequestContext {
    request_id: Uuid,
    model_group: String,
    token_count: u64,
    scheduled: Mutex<Scheduled>,
}

impl RequestContext {
    /// Creates a context for a new request. The start time is stamped now
    /// and re-stamped every time a provider is assigned.
    pub fn new(model_group: impl Into<String>, token_count: u64) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            model_group: model_group.into(),
            token_count,
            scheduled: Mutex::new(Scheduled { provider_id: None, start_time: Local::now() }),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn model_group(&self) -> &str {
        &self.model_group
    }

    pub fn token_count(&self) -> u64 {
        self.token_count
    }

    /// The provider scheduled for the current attempt, if any.
    pub fn provider_id(&self) -> Option<String> {
        self.scheduled.lock().expect("context lock poisoned").provider_id.clone()
    }

    /// Records the provider chosen for the next attempt and restarts the
    /// attempt clock.
    pub fn assign_provider(&self, provider_id: &str) {
        let mut scheduled = self.scheduled.lock().expect("context lock poisoned");
        scheduled.provider_id = Some(provider_id.to_string());
        scheduled.start_time = Local::now();
    }

    /// The minute bucket of the current attempt, formatted `YYYYMMDDhhmm`.
    pub fn start_minute(&self) -> String {
        self.scheduled
            .lock()
            .expect("context lock poisoned")
            .start_time
            .format(MINUTE_FORMAT)
            .to_string()
    }

    /// JSON dump of the context for log forwarding.
    pub fn serialize(&self) -> String {
        let scheduled = self.scheduled.lock().expect("context lock poisoned").clone();
        serde_json::json!({
            "request_id": self.request_id,
            "model_group": self.model_group,
            "token_count": self.token_count,
            "provider_id": scheduled.provider_id,
            "start_time": scheduled.start_time.to_rfc3339(),
        })
        .to_string()
    }
}
