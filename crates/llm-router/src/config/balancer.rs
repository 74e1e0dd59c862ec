use serde::Serialize;

/// Which load-balancing strategy the router schedules with.
///
/// `LatencyBased` and `CostBased` are reserved names; until they grow their
/// own implementations they schedule like `Random`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadBalancerStrategy {
    CapacityBased,
    LowestTpm,
    LatencyBased,
    CostBased,
    Random,
}

/// The capacity dimension a capacity-based balancer weights providers by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityDimension {
    Rpm,
    Tpm,
    Weight,
}

impl std::fmt::Display for CapacityDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CapacityDimension::Rpm => "rpm",
            CapacityDimension::Tpm => "tpm",
            CapacityDimension::Weight => "weight",
        };
        f.write_str(s)
    }
}

/// Load balancer configuration.
///
/// `capacity_dimension` is required (and must be exposed as a positive value
/// by every provider) when the strategy is `CapacityBased`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LoadBalancerConfig {
    pub strategy: LoadBalancerStrategy,
    pub capacity_dimension: Option<CapacityDimension>,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            strategy: LoadBalancerStrategy::CapacityBased,
            capacity_dimension: Some(CapacityDimension::Weight),
        }
    }
}
