//! Client-side routing for large-language-model providers.
//!
//! A caller submits a completion request against a *model group* — a logical
//! pool of interchangeable providers. The router picks one concrete provider
//! under a load-balancing strategy that respects per-provider rate limits
//! (requests-per-minute, tokens-per-minute, or weight), retries transient
//! failures with backoff, cools down providers that misbehave, and falls
//! back to a degraded model group when the primary group is unusable.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use llm_router::{CompletionParams, ProviderConfig, Router};
//! # use llm_router::provider::{CompletionResponse, LlmProvider};
//! # use llm_router_core::RouterError;
//! # struct MyProvider;
//! # #[async_trait::async_trait]
//! # impl LlmProvider for MyProvider {
//! #     fn name(&self) -> &str { "my-provider" }
//! #     async fn completion(
//! #         &self,
//! #         _params: &CompletionParams,
//! #     ) -> Result<CompletionResponse, RouterError> {
//! #         Ok(CompletionResponse::new("m", "ok"))
//! #     }
//! # }
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = ProviderConfig::builder("gpt-3.5-turbo", Arc::new(MyProvider))
//!     .rpm(60)
//!     .tpm(100_000)
//!     .build();
//!
//! let router = Router::builder()
//!     .provider_group("gpt3-level-model", vec![provider])
//!     .build()?;
//!
//! let response = router
//!     .completion(CompletionParams::from_text("gpt3-level-model", "Hello!"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! Logging is not installed implicitly; call [`logging::init`] with the
//! router's [`config::LogConfig`] to set up the process-wide subscriber
//! (colored console in `dev`, rotated NDJSON files in `prod`).

pub mod balance;
pub mod cache;
pub mod config;
pub mod context;
pub mod events;
pub mod locks;
pub mod logging;
pub mod model;
pub mod provider;
pub mod retry;
pub mod router;
pub mod status;
pub mod token;
pub mod usage;

pub use balance::LoadBalancer;
pub use cache::MemoryCache;
pub use config::{
    AllowedFailsPolicy, ConfigError, CooldownConfig, FallbackConfig, LoadBalancerConfig,
    LoadBalancerStrategy, RetryConfig, RetryPolicy, RouterConfig,
};
pub use context::RequestContext;
pub use model::{ChatMessage, CompletionParams};
pub use provider::{CompletionResponse, LlmProvider, ProviderConfig};
pub use router::{Router, RouterBuilder};
pub use token::{TiktokenCounter, TokenCounter};

pub use llm_router_core::{ConnectionKind, ErrorClass, RouterError};
