//! Error taxonomy for the router.
//!
//! Every failure that can surface from a routed completion call is one of
//! these variants. Two properties drive control flow and are exposed as
//! methods rather than inherited flags:
//!
//! - [`RouterError::is_retryable`]: whether the retry controller may attempt
//!   the call again (connection errors, timeouts, rate limits, 5xx).
//! - [`RouterError::should_fallback`]: whether the router may dispatch the
//!   request to a degraded model group after the primary group fails.
//!
//! Errors that mirror an HTTP-style provider response also carry a status
//! code, reachable through [`RouterError::status_code`].

use thiserror::Error;

/// The flavor of a connection-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// The network is unreachable.
    NetworkUnreachable,
    /// The peer reset the connection.
    ConnectionReset,
    /// The peer refused the connection.
    ConnectionRefused,
    /// Any other transport-level failure.
    Other,
}

impl std::fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnectionKind::NetworkUnreachable => "network unreachable",
            ConnectionKind::ConnectionReset => "connection reset",
            ConnectionKind::ConnectionRefused => "connection refused",
            ConnectionKind::Other => "connection error",
        };
        f.write_str(s)
    }
}

/// Coarse error class used by per-class retry and allowed-fails policies.
///
/// Several variants collapse into one class: `BadRequest`, `InvalidInput`,
/// `ContextWindowExceeded`, and `RetryExhausted` are all 400-class requests
/// for policy purposes, while `ContentPolicyViolation` keeps its own class
/// because both policies can target it individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    NoProviderAvailable,
    Connection,
    BadRequest,
    ContentPolicyViolation,
    Authentication,
    NotFound,
    Timeout,
    RateLimit,
    InternalServer,
}

/// Errors surfaced by the router and its collaborators.
#[derive(Debug, Clone, Error)]
pub enum RouterError {
    /// Every provider in the group is either cooled down or over capacity.
    #[error("no provider available for model group '{group}'")]
    NoProviderAvailable { group: String },

    /// The provider could not be reached at the transport level.
    #[error("{kind}: {message}")]
    Connection { kind: ConnectionKind, message: String },

    /// The provider rejected the request as malformed.
    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// The caller's input failed validation before scheduling.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The prompt does not fit the model's context window.
    #[error("context window exceeded: {message}")]
    ContextWindowExceeded { message: String },

    /// The provider's content filter rejected the request.
    #[error("content policy violation: {message}")]
    ContentPolicyViolation { message: String },

    /// The provider rejected the configured credentials.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The requested resource does not exist on the provider.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The requested model group is not configured on this router.
    #[error("model group '{group}' not found")]
    ModelGroupNotFound { group: String },

    /// The provider call exceeded its time budget.
    #[error("request timed out: {message}")]
    RequestTimeout { message: String },

    /// The provider throttled the request.
    #[error("rate limited: {message}")]
    RateLimit { message: String },

    /// The provider failed server-side. `status` is the HTTP-like status
    /// code and may be any value >= 500.
    #[error("internal server error (status {status}): {message}")]
    InternalServer { status: u16, message: String },

    /// The retry controller gave up. Carries the error from the final
    /// attempt.
    #[error("model call failed after {attempts} attempts")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last_error: Box<RouterError>,
    },
}

impl RouterError {
    /// HTTP-like status code, for errors that mirror a provider response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RouterError::NoProviderAvailable { .. } | RouterError::Connection { .. } => None,
            RouterError::BadRequest { .. }
            | RouterError::InvalidInput { .. }
            | RouterError::ContextWindowExceeded { .. }
            | RouterError::ContentPolicyViolation { .. }
            | RouterError::RetryExhausted { .. } => Some(400),
            RouterError::Authentication { .. } => Some(401),
            RouterError::NotFound { .. } | RouterError::ModelGroupNotFound { .. } => Some(404),
            RouterError::RequestTimeout { .. } => Some(408),
            RouterError::RateLimit { .. } => Some(429),
            RouterError::InternalServer { status, .. } => Some(*status),
        }
    }

    /// Whether the retry controller may re-attempt after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RouterError::Connection { .. }
                | RouterError::RequestTimeout { .. }
                | RouterError::RateLimit { .. }
                | RouterError::InternalServer { .. }
        )
    }

    /// Whether the router may dispatch to a degraded model group after this
    /// error terminates the attempt loop.
    pub fn should_fallback(&self) -> bool {
        matches!(
            self,
            RouterError::NoProviderAvailable { .. }
                | RouterError::InvalidInput { .. }
                | RouterError::ContextWindowExceeded { .. }
                | RouterError::ContentPolicyViolation { .. }
                | RouterError::Authentication { .. }
                | RouterError::ModelGroupNotFound { .. }
                | RouterError::RetryExhausted { .. }
        )
    }

    /// The policy class of this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            RouterError::NoProviderAvailable { .. } => ErrorClass::NoProviderAvailable,
            RouterError::Connection { .. } => ErrorClass::Connection,
            RouterError::BadRequest { .. }
            | RouterError::InvalidInput { .. }
            | RouterError::ContextWindowExceeded { .. }
            | RouterError::RetryExhausted { .. } => ErrorClass::BadRequest,
            RouterError::ContentPolicyViolation { .. } => ErrorClass::ContentPolicyViolation,
            RouterError::Authentication { .. } => ErrorClass::Authentication,
            RouterError::NotFound { .. } | RouterError::ModelGroupNotFound { .. } => {
                ErrorClass::NotFound
            }
            RouterError::RequestTimeout { .. } => ErrorClass::Timeout,
            RouterError::RateLimit { .. } => ErrorClass::RateLimit,
            RouterError::InternalServer { .. } => ErrorClass::InternalServer,
        }
    }

    /// Stable variant name, used in cooldown records and log fields.
    pub fn name(&self) -> &'static str {
        match self {
            RouterError::NoProviderAvailable { .. } => "NoProviderAvailable",
            RouterError::Connection { .. } => "Connection",
            RouterError::BadRequest { .. } => "BadRequest",
            RouterError::InvalidInput { .. } => "InvalidInput",
            RouterError::ContextWindowExceeded { .. } => "ContextWindowExceeded",
            RouterError::ContentPolicyViolation { .. } => "ContentPolicyViolation",
            RouterError::Authentication { .. } => "Authentication",
            RouterError::NotFound { .. } => "NotFound",
            RouterError::ModelGroupNotFound { .. } => "ModelGroupNotFound",
            RouterError::RequestTimeout { .. } => "RequestTimeout",
            RouterError::RateLimit { .. } => "RateLimit",
            RouterError::InternalServer { .. } => "InternalServer",
            RouterError::RetryExhausted { .. } => "RetryExhausted",
        }
    }
}
