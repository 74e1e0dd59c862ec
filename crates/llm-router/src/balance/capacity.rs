use std::sync::Arc;

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::config::CapacityDimension;
use crate::context::RequestContext;
use crate::provider::ProviderConfig;
use crate::usage::{Dimension, RpmTpmManager};

/// Weighted-random choice over a configurable capacity dimension.
///
/// Candidates over their RPM budget for the current minute are filtered out
/// first — the filter always uses RPM, whatever the weighting dimension is.
/// The survivor is sampled with probability proportional to its capacity;
/// when every capacity is zero the choice degrades to uniform.
pub struct CapacityBasedBalancer {
    usage: Arc<RpmTpmManager>,
    dimension: CapacityDimension,
}

impl CapacityBasedBalancer {
    pub fn new(usage: Arc<RpmTpmManager>, dimension: CapacityDimension) -> Self {
        Self { usage, dimension }
    }

    pub async fn schedule(
        &self,
        ctx: &RequestContext,
        group: &str,
        candidates: &[ProviderConfig],
    ) -> Option<ProviderConfig> {
        if candidates.is_empty() {
            return None;
        }
        let filtered = self.filter_over_limit(ctx, group, candidates).await;
        if filtered.is_empty() {
            warn!(group, "no providers available after filtering over RPM limits");
            return None;
        }
        self.select_weighted(&filtered)
    }

    async fn filter_over_limit(
        &self,
        ctx: &RequestContext,
        group: &str,
        candidates: &[ProviderConfig],
    ) -> Vec<ProviderConfig> {
        let mut filtered = Vec::with_capacity(candidates.len());
        for p in candidates {
            let usage = self.usage.usage(ctx, Dimension::Rpm, group, p.id()).await;
            debug!(provider = p.id(), usage, "rpm usage");
            let within_limit = p.rpm.map_or(true, |cap| usage + 1 <= u64::from(cap));
            if within_limit {
                filtered.push(p.clone());
            }
        }
        filtered
    }

    fn select_weighted(&self, providers: &[ProviderConfig]) -> Option<ProviderConfig> {
        let values: Vec<u64> = providers.iter().map(|p| self.capacity_of(p)).collect();
        let total: u64 = values.iter().sum();
        let mut rng = rand::rng();
        if total == 0 {
            debug!("all providers have zero capacity, selecting uniformly");
            return providers.choose(&mut rng).cloned();
        }
        let mut point = rng.random_range(0..total);
        for (provider, value) in providers.iter().zip(&values) {
            if point < *value {
                debug!(provider = provider.id(), "selected provider");
                return Some(provider.clone());
            }
            point -= value;
        }
        providers.last().cloned()
    }

    fn capacity_of(&self, p: &ProviderConfig) -> u64 {
        match self.dimension {
            CapacityDimension::Rpm => p.rpm.map_or(0, u64::from),
            CapacityDimension::Tpm => p.tpm.map_or(0, u64::from),
            CapacityDimension::Weight => p.weight.map_or(1, u64::from),
        }
    }
}
