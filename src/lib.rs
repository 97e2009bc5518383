//! A client-side, priority-aware load balancing transport for Azure
//! OpenAI-style backends.
//!
//! This crate sits between an application's OpenAI-style HTTP client and a
//! set of equivalent upstream endpoints, retargeting each outbound request
//! to one of several pre-configured backend hosts according to a
//! priority/availability policy. Per-backend throttling state is derived
//! from upstream `429`/`5xx` responses: a backend that's throttled is
//! skipped until its `Retry-After` window elapses or it's observed to
//! succeed. When the entire pool is exhausted, the transport synthesizes a
//! single `429` response carrying the earliest recovery time so the
//! caller's own retry/backoff logic can proceed.
//!
//! # Example
//!
//! ```
//! use azure_openai_loadbalancer::{AsyncLoadBalancer, LoadBalancerConfig, ReqwestTransport};
//! use std::sync::Arc;
//!
//! # fn build() -> Result<(), azure_openai_loadbalancer::ConfigError> {
//! let config = Arc::new(
//!     LoadBalancerConfig::builder()
//!         .backend("eastus.openai.azure.com", 1, None)
//!         .backend("westus.openai.azure.com", 2, Some("api-key-2".into()))
//!         .build()?,
//! );
//!
//! let balancer = AsyncLoadBalancer::new(ReqwestTransport::default(), config);
//! # let _ = balancer;
//! # Ok(())
//! # }
//! ```
//!
//! Two transport variants share one state machine: [`AsyncLoadBalancer`]
//! implements `tower::Service` for cooperative-suspension callers;
//! [`BlockingLoadBalancer`] implements the crate-local [`BlockingTransport`]
//! trait for synchronous callers. Both compose with a default `reqwest`
//! transport internally ([`ReqwestTransport`] / [`ReqwestBlockingTransport`])
//! but accept any underlying transport implementing the matching trait.
//! [`LoadBalancerLayer`] wraps [`AsyncLoadBalancer`] as a `tower::Layer` for
//! `ServiceBuilder` composition.
//!
//! This crate deliberately does not: maintain shared state across
//! processes (selection uses only process-local randomness), implement
//! weighted/fair routing, predict rate limits ahead of a 429, or multiplex
//! a single logical request across backends concurrently.

mod async_balancer;
mod backend;
mod blocking;
mod config;
mod core;
mod error;
mod events;
mod layer;
mod registry;
mod selector;
mod transport;

pub use async_balancer::AsyncLoadBalancer;
pub use backend::BackendState;
pub use blocking::{BlockingLoadBalancer, BlockingTransport};
pub use config::{LoadBalancerConfig, LoadBalancerConfigBuilder, DEFAULT_RETRY_AFTER, RETRIABLE_5XX};
pub use error::ConfigError;
pub use events::{EventListener, LoadBalancerEvent};
pub use layer::LoadBalancerLayer;
pub use transport::{ReqwestBlockingTransport, ReqwestTransport};
