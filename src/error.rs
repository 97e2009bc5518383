//! Construction-time error types.

use thiserror::Error;

/// Errors that can occur while building a [`crate::LoadBalancerConfig`].
///
/// These are the only error kind this crate itself raises; transport
/// failures surface as the inner service's own error type, propagated
/// unchanged.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The builder was asked to build a load balancer with no backends.
    #[error("at least one backend must be configured")]
    EmptyBackendList,

    /// A backend was configured with a priority that isn't positive.
    #[error("backend {host:?} has non-positive priority {priority}")]
    NonPositivePriority { host: String, priority: i64 },
}
