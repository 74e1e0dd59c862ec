use std::collections::HashMap;

use serde::Serialize;

/// Fallback routing: which degraded model groups to try, in order, when a
/// group cannot satisfy a call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FallbackConfig {
    /// Model group to the ordered list of groups to degrade to,
    /// e.g. `{"gpt-4-level": ["gpt-3-level"]}`.
    pub degraded_map: HashMap<String, Vec<String>>,
    /// Fallback only happens when this is explicitly enabled.
    pub allow_fallback: Option<bool>,
}

impl FallbackConfig {
    /// A config that disables fallback regardless of the degraded map.
    pub fn disabled() -> Self {
        Self { degraded_map: HashMap::new(), allow_fallback: Some(false) }
    }
}
