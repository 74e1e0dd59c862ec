//! The router: end-to-end dispatch of one completion call.
//!
//! Per call: count tokens, create the request context, then run the inner
//! step — healthy providers, balancer choice, provider invocation — through
//! the retry controller. Each attempt reserves RPM/TPM capacity for the
//! scheduled provider right after scheduling and either confirms it on
//! success or releases it on failure; failures are reported to the status
//! manager before the retry decision so a cooldown affects the next
//! attempt's candidate set.
//!
//! When the attempt loop ends with a fallback-eligible error the router
//! walks the group's degraded chain, re-entering dispatch with a fresh
//! context, a single-attempt retry budget, and fallback disabled.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, error, info, info_span, warn, Instrument};

use llm_router_core::events::Listeners;
use llm_router_core::RouterError;

use crate::balance::LoadBalancer;
use crate::cache::{CacheSettings, MemoryCache};
use crate::config::{
    ConfigError, CooldownConfig, FallbackConfig, LoadBalancerConfig, LogConfig, RetryConfig,
    RouterConfig,
};
use crate::context::RequestContext;
use crate::events::{CacheEvent, ProviderStatusEvent, RetryEvent};
use crate::model::CompletionParams;
use crate::provider::{CompletionResponse, ProviderConfig};
use crate::retry::RetryController;
use crate::status::ProviderStatusManager;
use crate::token::{TiktokenCounter, TokenCounter};
use crate::usage::RpmTpmManager;

/// Routes completion calls across provider groups.
pub struct Router {
    cache: Arc<MemoryCache>,
    status: Arc<ProviderStatusManager>,
    usage: Arc<RpmTpmManager>,
    balancer: LoadBalancer,
    token_counter: Arc<dyn TokenCounter>,
    retry_defaults: RetryConfig,
    fallback_defaults: FallbackConfig,
    retry_listeners: Listeners<RetryEvent>,
    timeout: Option<Duration>,
}

impl Router {
    /// Builds a router from a complete configuration.
    pub fn new(config: RouterConfig) -> Result<Self, ConfigError> {
        RouterBuilder::from_config(config).build()
    }

    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Runs one completion call against a model group.
    pub async fn completion(
        &self,
        params: CompletionParams,
    ) -> Result<CompletionResponse, RouterError> {
        self.completion_inner(params).await
    }

    // Boxed so fallback can re-enter dispatch recursively.
    fn completion_inner(
        &self,
        params: CompletionParams,
    ) -> BoxFuture<'_, Result<CompletionResponse, RouterError>> {
        Box::pin(async move {
            self.cache.start_sweeper();
            params.validate()?;

            let token_count = self.token_counter.count(
                None,
                params.messages.as_deref(),
                params.text.as_deref(),
            );
            let ctx = RequestContext::new(&params.model_group, token_count);
            let span = info_span!(
                "completion",
                request_id = %ctx.request_id(),
                model_group = %ctx.model_group(),
            );
            async move {
                debug!(context = %ctx.serialize(), "created request context");
                let effective = self.normalize(&params);
                let retry_config = effective
                    .retry
                    .clone()
                    .unwrap_or_else(|| self.retry_defaults.clone());
                let controller = RetryController::new(
                    retry_config.max_attempt,
                    retry_config.retry_policy,
                    self.retry_listeners.clone(),
                );

                match controller.execute(|| self.step(&ctx, &effective)).await {
                    Ok(response) => {
                        info!(model = %response.model, "completion succeeded");
                        Ok(response)
                    }
                    Err(err) if err.should_fallback() => {
                        warn!(error = %err, "attempting fallback");
                        self.trigger_fallback(&effective, err).await
                    }
                    Err(err) => {
                        error!(error = %err, "completion failed");
                        Err(err)
                    }
                }
            }
            .instrument(span)
            .await
        })
    }

    /// One attempt: pick a healthy provider, reserve capacity, invoke.
    async fn step(
        &self,
        ctx: &RequestContext,
        params: &CompletionParams,
    ) -> Result<CompletionResponse, RouterError> {
        let group = ctx.model_group();
        let available = self.status.available_providers(group).await?;
        let Some(chosen) = self.balancer.schedule(ctx, group, &available).await else {
            return Err(RouterError::NoProviderAvailable { group: group.to_string() });
        };
        ctx.assign_provider(chosen.id());
        debug!(provider = chosen.id(), "scheduled provider");

        let guard = self.usage.begin_attempt(ctx, group, chosen.id()).await;
        let call = chosen.implementation.completion(params);
        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => Err(RouterError::RequestTimeout {
                    message: format!("provider call exceeded {}s", limit.as_secs()),
                }),
            },
            None => call.await,
        };

        match result {
            Ok(response) => {
                guard.confirm().await;
                Ok(response)
            }
            Err(err) => {
                // Classify before the retry decision so a cooldown shapes
                // the next attempt's candidate set.
                self.status.record_failure(chosen.id(), &err).await;
                guard.release().await;
                Err(err)
            }
        }
    }

    /// Fills unset per-call configs from the router defaults, on a copy.
    fn normalize(&self, params: &CompletionParams) -> CompletionParams {
        let mut effective = params.clone();
        if effective.retry.is_none() {
            effective.retry = Some(self.retry_defaults.clone());
        }
        if effective.fallback.is_none() {
            effective.fallback = Some(self.fallback_defaults.clone());
        }
        effective
    }

    /// Walks the degraded chain for the failed group. Each nested call gets
    /// one attempt and no further fallback.
    async fn trigger_fallback(
        &self,
        params: &CompletionParams,
        original: RouterError,
    ) -> Result<CompletionResponse, RouterError> {
        let fallback_config = params
            .fallback
            .clone()
            .unwrap_or_else(|| self.fallback_defaults.clone());
        if !fallback_config.allow_fallback.unwrap_or(false) {
            info!("no fallback model specified");
            return Err(original);
        }
        let Some(chain) = fallback_config
            .degraded_map
            .get(&params.model_group)
            .filter(|chain| !chain.is_empty())
        else {
            info!("no fallback model specified");
            return Err(original);
        };

        let mut last_error = original;
        for fallback_group in chain {
            info!(%fallback_group, "trying fallback model group");
            let mut nested = params.clone();
            nested.model_group = fallback_group.clone();
            nested.retry = Some(RetryConfig::single_attempt());
            nested.fallback = Some(FallbackConfig::disabled());
            match self.completion_inner(nested).await {
                Ok(response) => return Ok(response),
                Err(err) => last_error = err,
            }
        }
        Err(last_error)
    }

    /// Stops the background sweep. In-flight calls complete normally.
    pub fn shutdown(&self) {
        self.cache.shutdown();
    }
}

/// Builder for [`Router`].
pub struct RouterBuilder {
    config: RouterConfig,
    token_counter: Option<Arc<dyn TokenCounter>>,
    retry_listeners: Listeners<RetryEvent>,
    status_listeners: Listeners<ProviderStatusEvent>,
    cache_listeners: Listeners<CacheEvent>,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::from_config(RouterConfig::default())
    }
}

impl RouterBuilder {
    pub fn from_config(config: RouterConfig) -> Self {
        Self {
            config,
            token_counter: None,
            retry_listeners: Listeners::new(),
            status_listeners: Listeners::new(),
            cache_listeners: Listeners::new(),
        }
    }

    /// Adds a model group backed by the given providers, in order.
    pub fn provider_group(
        mut self,
        name: impl Into<String>,
        providers: Vec<ProviderConfig>,
    ) -> Self {
        self.config.provider_groups.insert(name.into(), providers);
        self
    }

    pub fn load_balancer(mut self, load_balancer: LoadBalancerConfig) -> Self {
        self.config.load_balancer = load_balancer;
        self
    }

    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn fallback_config(mut self, fallback: FallbackConfig) -> Self {
        self.config.fallback = fallback;
        self
    }

    pub fn cooldown_config(mut self, cooldown: CooldownConfig) -> Self {
        self.config.cooldown = cooldown;
        self
    }

    pub fn log_config(mut self, log: LogConfig) -> Self {
        self.config.log = log;
        self
    }

    /// Upper bound on a single provider call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Removes the per-call timeout.
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Replaces the default tiktoken-backed counter.
    pub fn token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = Some(counter);
        self
    }

    /// Registers a callback for retry-controller events.
    pub fn on_retry_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        self.retry_listeners.subscribe(f);
        self
    }

    /// Registers a callback for provider-status events.
    pub fn on_status_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&ProviderStatusEvent) + Send + Sync + 'static,
    {
        self.status_listeners.subscribe(f);
        self
    }

    /// Registers a callback for cache events.
    pub fn on_cache_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.cache_listeners.subscribe(f);
        self
    }

    pub fn build(self) -> Result<Router, ConfigError> {
        self.config.validate()?;

        let token_counter: Arc<dyn TokenCounter> = match self.token_counter {
            Some(counter) => counter,
            None => Arc::new(TiktokenCounter::new()?),
        };

        let cache = Arc::new(MemoryCache::with_listeners(
            CacheSettings::default(),
            self.cache_listeners,
        ));
        let usage = Arc::new(RpmTpmManager::new(Arc::clone(&cache)));
        let status = Arc::new(ProviderStatusManager::new(
            Arc::clone(&cache),
            self.config.provider_groups.clone(),
            self.config.cooldown,
            self.status_listeners,
        ));

        // The periodic sweep also evicts named locks for stale minutes.
        {
            let usage = Arc::clone(&usage);
            cache.add_sweep_hook(Arc::new(move || usage.purge_stale_locks()));
        }
        {
            let status = Arc::clone(&status);
            cache.add_sweep_hook(Arc::new(move || status.purge_stale_locks()));
        }

        let balancer = LoadBalancer::from_config(&self.config.load_balancer, Arc::clone(&usage));

        Ok(Router {
            cache,
            status,
            usage,
            balancer,
            token_counter,
            retry_defaults: self.config.retry,
            fallback_defaults: self.config.fallback,
            retry_listeners: self.retry_listeners,
            timeout: self.config.timeout,
        })
    }
}
