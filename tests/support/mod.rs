//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use llm_router::provider::{CompletionResponse, LlmProvider, ProviderConfig};
use llm_router::token::TokenCounter;
use llm_router::{ChatMessage, CompletionParams, RouterError};

/// A provider that replays a scripted queue of outcomes, then succeeds.
pub struct ScriptedProvider {
    name: &'static str,
    outcomes: Mutex<Vec<Result<CompletionResponse, RouterError>>>,
    calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn new(
        name: &'static str,
        outcomes: Vec<Result<CompletionResponse, RouterError>>,
    ) -> Arc<Self> {
        Arc::new(Self { name, outcomes: Mutex::new(outcomes), calls: AtomicU32::new(0) })
    }

    /// A provider that always succeeds.
    pub fn ok(name: &'static str) -> Arc<Self> {
        Self::new(name, Vec::new())
    }

    /// A provider that fails with clones of `error` for its first 64 calls.
    pub fn failing(name: &'static str, error: RouterError) -> Arc<Self> {
        Self::new(name, std::iter::repeat_with(|| Err(error.clone())).take(64).collect())
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        self.name
    }

    async fn completion(
        &self,
        _params: &CompletionParams,
    ) -> Result<CompletionResponse, RouterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.is_empty() {
            Ok(CompletionResponse::new(self.name, format!("{} says ok", self.name)))
        } else {
            outcomes.remove(0)
        }
    }
}

/// A deterministic token counter, avoiding tokenizer setup in tests.
pub struct FixedCounter(pub u64);

impl TokenCounter for FixedCounter {
    fn count(
        &self,
        _model: Option<&str>,
        _messages: Option<&[ChatMessage]>,
        _text: Option<&str>,
    ) -> u64 {
        self.0
    }
}

/// A provider config with optional capacities around a scripted impl.
pub fn provider_config(
    model: &str,
    implementation: Arc<ScriptedProvider>,
    rpm: Option<u32>,
    tpm: Option<u32>,
) -> ProviderConfig {
    let mut builder = ProviderConfig::builder(model, implementation);
    if let Some(rpm) = rpm {
        builder = builder.rpm(rpm);
    }
    if let Some(tpm) = tpm {
        builder = builder.tpm(tpm);
    }
    builder.build()
}

pub fn rate_limit() -> RouterError {
    RouterError::RateLimit { message: "throttled".into() }
}

pub fn connection_reset() -> RouterError {
    RouterError::Connection {
        kind: llm_router::ConnectionKind::ConnectionReset,
        message: "reset by peer".into(),
    }
}

pub fn invalid_input() -> RouterError {
    RouterError::InvalidInput { message: "rejected by provider".into() }
}
