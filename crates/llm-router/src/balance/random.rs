use rand::seq::IndexedRandom;

use crate::provider::ProviderConfig;

/// Uniform random choice among the candidates.
pub struct RandomBalancer;

impl RandomBalancer {
    pub fn schedule(&self, candidates: &[ProviderConfig]) -> Option<ProviderConfig> {
        candidates.choose(&mut rand::rng()).cloned()
    }
}
