//! Router configuration.
//!
//! All configuration is immutable once the router is built. `RouterConfig`
//! aggregates the per-concern configs from the submodules; validation
//! happens in [`RouterConfig::validate`], which the router builder runs
//! before constructing anything.

mod balancer;
mod cooldown;
mod fallback;
mod log;
mod retry;

pub use balancer::{CapacityDimension, LoadBalancerConfig, LoadBalancerStrategy};
pub use cooldown::{AllowedFailsPolicy, CooldownConfig};
pub use fallback::FallbackConfig;
pub use log::{LogConfig, LogLevel, Stage};
pub use retry::{RetryConfig, RetryPolicy};

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::provider::ProviderConfig;

/// Named, ordered pools of interchangeable providers.
pub type ProviderGroups = HashMap<String, Vec<ProviderConfig>>;

/// Errors raised while validating or building a router configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("retry max_attempt must be at least 1")]
    ZeroMaxAttempt,

    #[error("capacity-based balancing requires a capacity dimension")]
    MissingCapacityDimension,

    #[error(
        "provider '{model_id}' in group '{group}' must expose a positive '{dimension}' \
         for capacity-based balancing"
    )]
    MissingProviderCapacity {
        group: String,
        model_id: String,
        dimension: CapacityDimension,
    },

    #[error("failed to initialize tokenizer: {message}")]
    TokenizerInit { message: String },

    #[error("failed to initialize logging: {message}")]
    LoggingInit { message: String },
}

/// Complete configuration for one router instance.
#[derive(Debug, Clone, Serialize)]
pub struct RouterConfig {
    /// Model group name to the ordered providers backing it.
    pub provider_groups: ProviderGroups,
    pub log: LogConfig,
    pub load_balancer: LoadBalancerConfig,
    pub retry: RetryConfig,
    pub fallback: FallbackConfig,
    pub cooldown: CooldownConfig,
    /// Upper bound on one provider call, not on the whole pipeline.
    pub timeout: Option<Duration>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            provider_groups: HashMap::new(),
            log: LogConfig::default(),
            load_balancer: LoadBalancerConfig::default(),
            retry: RetryConfig::default(),
            fallback: FallbackConfig::default(),
            cooldown: CooldownConfig::default(),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl RouterConfig {
    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempt == 0 {
            return Err(ConfigError::ZeroMaxAttempt);
        }
        if self.load_balancer.strategy == LoadBalancerStrategy::CapacityBased {
            let dimension = self
                .load_balancer
                .capacity_dimension
                .ok_or(ConfigError::MissingCapacityDimension)?;
            for (group, providers) in &self.provider_groups {
                for p in providers {
                    // An absent weight means unit weight; absent rpm/tpm mean
                    // unlimited, which cannot be weighted against.
                    let value = match dimension {
                        CapacityDimension::Rpm => p.rpm,
                        CapacityDimension::Tpm => p.tpm,
                        CapacityDimension::Weight => Some(p.weight.unwrap_or(1)),
                    };
                    if !value.is_some_and(|v| v > 0) {
                        return Err(ConfigError::MissingProviderCapacity {
                            group: group.clone(),
                            model_id: p.model_id.clone(),
                            dimension,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// JSON dump for diagnostics. Provider implementations render as their
    /// identity strings.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
