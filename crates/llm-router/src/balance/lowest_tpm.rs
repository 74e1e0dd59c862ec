use std::sync::Arc;

use tracing::debug;

use crate::context::RequestContext;
use crate::provider::ProviderConfig;
use crate::usage::{Dimension, RpmTpmManager};

/// Picks the provider with the lowest current TPM that can still absorb the
/// request.
///
/// A candidate is available iff adding the request's token count stays
/// within its TPM ceiling and one more request stays within its RPM ceiling;
/// a missing ceiling counts as unlimited. Ties keep the first-seen
/// candidate.
pub struct LowestTpmBalancer {
    usage: Arc<RpmTpmManager>,
}

impl LowestTpmBalancer {
    pub fn new(usage: Arc<RpmTpmManager>) -> Self {
        Self { usage }
    }

    pub async fn schedule(
        &self,
        ctx: &RequestContext,
        group: &str,
        candidates: &[ProviderConfig],
    ) -> Option<ProviderConfig> {
        let input_tokens = ctx.token_count();
        debug!(input_tokens, "scheduling by lowest tpm");

        let mut lowest_tpm = u64::MAX;
        let mut optimal: Option<&ProviderConfig> = None;
        for p in candidates {
            let current_tpm = self.usage.usage(ctx, Dimension::Tpm, group, p.id()).await;
            let current_rpm = self.usage.usage(ctx, Dimension::Rpm, group, p.id()).await;
            if !Self::is_available(p.tpm, p.rpm, current_rpm, current_tpm, input_tokens) {
                debug!(provider = %p.model_id, "skipping unavailable provider");
                continue;
            }
            if current_tpm < lowest_tpm {
                lowest_tpm = current_tpm;
                optimal = Some(p);
            }
        }
        optimal.cloned()
    }

    fn is_available(
        max_tpm: Option<u32>,
        max_rpm: Option<u32>,
        current_rpm: u64,
        current_tpm: u64,
        input_tokens: u64,
    ) -> bool {
        if let Some(cap) = max_tpm {
            if current_tpm + input_tokens > u64::from(cap) {
                return false;
            }
        }
        if let Some(cap) = max_rpm {
            if current_rpm + 1 > u64::from(cap) {
                return false;
            }
        }
        true
    }
}
