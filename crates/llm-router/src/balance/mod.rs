//! Load-balancing strategies.
//!
//! A balancer picks one provider out of the candidates the status manager
//! deemed healthy. Strategies are a closed set with a single `schedule`
//! entry point; the variants carry exactly the state they need.
//!
//! Scheduling reads usage without holding any lock across the decision, so
//! two concurrent calls may pick the same provider near its limit. The
//! reservation step catches the overshoot on the next minute boundary.

mod capacity;
mod lowest_tpm;
mod random;

pub use capacity::CapacityBasedBalancer;
pub use lowest_tpm::LowestTpmBalancer;
pub use random::RandomBalancer;

use std::sync::Arc;

use tracing::info;

use crate::config::{CapacityDimension, LoadBalancerConfig, LoadBalancerStrategy};
use crate::context::RequestContext;
use crate::provider::ProviderConfig;
use crate::usage::RpmTpmManager;

/// A provider-selection strategy.
pub enum LoadBalancer {
    Random(RandomBalancer),
    CapacityBased(CapacityBasedBalancer),
    LowestTpm(LowestTpmBalancer),
}

impl LoadBalancer {
    /// Builds the strategy selected by the configuration.
    ///
    /// `LatencyBased` and `CostBased` are reserved names and schedule like
    /// `Random` until implemented.
    pub fn from_config(config: &LoadBalancerConfig, usage: Arc<RpmTpmManager>) -> Self {
        info!(strategy = ?config.strategy, "routing strategy");
        match config.strategy {
            LoadBalancerStrategy::CapacityBased => {
                let dimension =
                    config.capacity_dimension.unwrap_or(CapacityDimension::Weight);
                LoadBalancer::CapacityBased(CapacityBasedBalancer::new(usage, dimension))
            }
            LoadBalancerStrategy::LowestTpm => {
                LoadBalancer::LowestTpm(LowestTpmBalancer::new(usage))
            }
            LoadBalancerStrategy::Random
            | LoadBalancerStrategy::LatencyBased
            | LoadBalancerStrategy::CostBased => LoadBalancer::Random(RandomBalancer),
        }
    }

    /// Chooses one provider from `candidates`, or `None` when no candidate
    /// can take the request.
    pub async fn schedule(
        &self,
        ctx: &RequestContext,
        group: &str,
        candidates: &[ProviderConfig],
    ) -> Option<ProviderConfig> {
        match self {
            LoadBalancer::Random(b) => b.schedule(candidates),
            LoadBalancer::CapacityBased(b) => b.schedule(ctx, group, candidates).await,
            LoadBalancer::LowestTpm(b) => b.schedule(ctx, group, candidates).await,
        }
    }
}
