//! Tower layer construction for the async load balancer.

use std::sync::Arc;

use tower_layer::Layer;

use crate::async_balancer::AsyncLoadBalancer;
use crate::config::LoadBalancerConfig;

/// A `tower::Layer` that wraps an inner transport with priority-aware load
/// balancing, for composition with `ServiceBuilder`.
///
/// There is exactly one way to build a [`LoadBalancerLayer`]: from an
/// already-validated [`LoadBalancerConfig`]. The blocking variant has no
/// layer, since `tower::Layer` has no synchronous analogue.
#[derive(Clone)]
pub struct LoadBalancerLayer {
    config: Arc<LoadBalancerConfig>,
}

impl LoadBalancerLayer {
    /// Creates a new layer from an already-built configuration.
    pub fn new(config: Arc<LoadBalancerConfig>) -> Self {
        Self { config }
    }
}

impl<S> Layer<S> for LoadBalancerLayer {
    type Service = AsyncLoadBalancer<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AsyncLoadBalancer::new(inner, Arc::clone(&self.config))
    }
}
