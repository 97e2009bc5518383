//! Backend descriptor data model.

use std::time::Instant;

/// A single upstream endpoint and its mutable throttling state.
///
/// The immutable fields (`host`, `priority`, `api_key`) are set at
/// configuration time and never change afterward; `is_throttling`,
/// `retry_after`, `successful_call_count`, and `attempts` are mutated only
/// while the registry's mutex is held.
#[derive(Debug, Clone)]
pub struct BackendState {
    /// DNS name of the upstream endpoint (no scheme, no path).
    pub host: String,
    /// Positive integer priority; lower is more preferred. `1` is highest.
    pub priority: u32,
    /// When set, requests to this backend carry `api-key` instead of
    /// whatever `Authorization` the upstream client supplied.
    pub api_key: Option<String>,
    /// Whether this backend is currently throttled.
    pub is_throttling: bool,
    /// Instant at which throttling lifts. Meaningful only while
    /// `is_throttling` is true.
    pub retry_after: Option<Instant>,
    /// Monotonic count of 2xx responses observed from this backend.
    pub successful_call_count: u64,
    /// Monotonic count of dispatch attempts to this backend.
    pub attempts: u64,
}

impl BackendState {
    pub(crate) fn new(host: String, priority: u32, api_key: Option<String>) -> Self {
        Self {
            host,
            priority,
            api_key,
            is_throttling: false,
            retry_after: None,
            successful_call_count: 0,
            attempts: 0,
        }
    }
}

/// A backend descriptor as supplied at construction time, before it gains
/// mutable throttling state.
///
/// `priority` is kept as the caller's raw `i64` so construction-time
/// validation can report the offending value; it is narrowed to `u32` only
/// after [`crate::config::LoadBalancerConfigBuilder::build`] confirms it is
/// positive.
#[derive(Debug, Clone)]
pub struct BackendDescriptor {
    pub host: String,
    pub priority: i64,
    pub api_key: Option<String>,
}
