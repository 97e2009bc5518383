//! Cooperative-suspension (`tower::Service`) load balancer variant.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::{Request, Response};
use tower_service::Service;

use crate::config::LoadBalancerConfig;
use crate::core::{interpret_response, select_and_rewrite, InterpretOutcome, StepOutcome};

/// A `tower::Service` that load-balances requests across a prioritized pool
/// of backends, retrying upstream 429/5xx responses across the pool before
/// synthesizing a terminal 429 if every backend is throttled.
///
/// `T` is the underlying HTTP transport this balancer dispatches through
/// (default: [`crate::transport::ReqwestTransport`]); it must itself be a
/// `tower::Service<Request<Bytes>, Response = Response<Bytes>>`.
#[derive(Clone)]
pub struct AsyncLoadBalancer<T> {
    inner: T,
    config: Arc<LoadBalancerConfig>,
}

impl<T> AsyncLoadBalancer<T> {
    /// Wraps `inner` with load-balancing behavior driven by `config`.
    pub fn new(inner: T, config: Arc<LoadBalancerConfig>) -> Self {
        Self { inner, config }
    }
}

impl<T> Service<Request<Bytes>> for AsyncLoadBalancer<T>
where
    T: Service<Request<Bytes>, Response = Response<Bytes>> + Clone + Send + 'static,
    T::Future: Send + 'static,
    T::Error: Send + 'static,
{
    type Response = Response<Bytes>;
    type Error = T::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let config = Arc::clone(&self.config);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let current = request;

            loop {
                let now = Instant::now();

                let (index, dispatch_request) =
                    match select_and_rewrite(&config, &current, now) {
                        StepOutcome::Dispatch { index, request } => (index, request),
                        StepOutcome::Return(response) => return Ok(response),
                    };

                let host = config.registry.host(index);

                // The registry lock is never held across this point: the
                // SELECT step above and the INTERPRET step below each take
                // and release it, and this await is the only suspension
                // point per attempt.
                let response = inner.call(dispatch_request).await?;

                match interpret_response(&config, index, &host, response, Instant::now()) {
                    InterpretOutcome::Return(response) => return Ok(response),
                    InterpretOutcome::Retry => continue,
                }
            }
        })
    }
}
