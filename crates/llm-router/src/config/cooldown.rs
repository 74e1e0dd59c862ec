use serde::Serialize;

/// Per-error-class overrides for the number of failures tolerated per minute
/// before a provider is cooled down.
///
/// An unset field falls through to [`CooldownConfig::general_allowed_fails`].
/// Note that rate limits and authentication failures cool down
/// unconditionally, before the counter is consulted, so their overrides
/// never fire.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AllowedFailsPolicy {
    pub bad_request_allowed_fails: Option<u32>,
    pub authentication_allowed_fails: Option<u32>,
    pub timeout_allowed_fails: Option<u32>,
    pub rate_limit_allowed_fails: Option<u32>,
    pub content_policy_violation_allowed_fails: Option<u32>,
}

/// Cooldown behavior for misbehaving providers.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CooldownConfig {
    /// How long a cooled-down provider is excluded from scheduling.
    pub cooldown_seconds: u64,
    /// Failures tolerated per provider per minute before cooldown, for error
    /// classes without a policy override.
    pub general_allowed_fails: u32,
    pub allowed_fails_policy: AllowedFailsPolicy,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 60,
            general_allowed_fails: 3,
            allowed_fails_policy: AllowedFailsPolicy::default(),
        }
    }
}
