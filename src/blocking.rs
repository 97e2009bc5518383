//! Blocking load balancer variant.
//!
//! `tower::Service` has no synchronous analogue in the ecosystem, so this
//! variant is driven by a crate-local [`BlockingTransport`] trait instead.
//! It shares the identical SELECT -> DISPATCH -> INTERPRET loop with
//! [`crate::async_balancer::AsyncLoadBalancer`] via [`crate::core`]; only
//! the dispatch primitive (a blocking call instead of an awaited future) is
//! specific to this module.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::{Request, Response};

use crate::config::LoadBalancerConfig;
use crate::core::{interpret_response, select_and_rewrite, InterpretOutcome, StepOutcome};

/// The synchronous analogue of `tower::Service<Request<Bytes>>`: a single
/// blocking `call` that sends a request and returns its response.
pub trait BlockingTransport {
    type Error;

    fn call(&self, request: Request<Bytes>) -> Result<Response<Bytes>, Self::Error>;
}

/// Blocking variant of the load balancer, sharing semantics with
/// [`crate::async_balancer::AsyncLoadBalancer`].
///
/// `T` is the underlying blocking HTTP transport (default:
/// [`crate::transport::ReqwestBlockingTransport`]).
pub struct BlockingLoadBalancer<T> {
    inner: T,
    config: Arc<LoadBalancerConfig>,
}

impl<T: BlockingTransport> BlockingLoadBalancer<T> {
    /// Wraps `inner` with load-balancing behavior driven by `config`.
    pub fn new(inner: T, config: Arc<LoadBalancerConfig>) -> Self {
        Self { inner, config }
    }

    /// Returns a reference to the underlying transport.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Sends `request`, load-balancing across the configured backend pool.
    pub fn call_blocking(&self, request: Request<Bytes>) -> Result<Response<Bytes>, T::Error> {
        let current = request;

        loop {
            let now = Instant::now();

            let (index, dispatch_request) =
                match select_and_rewrite(&self.config, &current, now) {
                    StepOutcome::Dispatch { index, request } => (index, request),
                    StepOutcome::Return(response) => return Ok(response),
                };

            let host = self.config.registry.host(index);

            // The registry lock is released before this call: it is the
            // only blocking point per attempt, matching the async variant's
            // single await point.
            let response = self.inner.call(dispatch_request)?;

            match interpret_response(&self.config, index, &host, response, Instant::now()) {
                InterpretOutcome::Return(response) => return Ok(response),
                InterpretOutcome::Retry => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadBalancerConfig;
    use http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MockTransport {
        calls: AtomicUsize,
        responses: Mutex<Vec<Response<Bytes>>>,
    }

    impl MockTransport {
        fn new(responses: Vec<Response<Bytes>>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                responses: Mutex::new(responses),
            }
        }
    }

    impl BlockingTransport for MockTransport {
        type Error = std::convert::Infallible;

        fn call(&self, _request: Request<Bytes>) -> Result<Response<Bytes>, Self::Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                Ok(responses.remove(0))
            } else {
                Ok(responses[0].clone())
            }
        }
    }

    fn response(status: u16) -> Response<Bytes> {
        Response::builder()
            .status(StatusCode::from_u16(status).unwrap())
            .body(Bytes::new())
            .unwrap()
    }

    fn get(uri: &str) -> Request<Bytes> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
    }

    #[test]
    fn single_success_dispatches_once() {
        let config = Arc::new(
            LoadBalancerConfig::builder()
                .backend("a.example.com", 1, None)
                .build()
                .unwrap(),
        );
        let transport = MockTransport::new(vec![response(200)]);
        let balancer = BlockingLoadBalancer::new(transport, config.clone());

        let response = balancer.call_blocking(get("https://seed/x")).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(balancer.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(config.registry.snapshot_all()[0].successful_call_count, 1);
    }

    #[test]
    fn retries_across_tier_on_429_then_returns_success() {
        let config = Arc::new(
            LoadBalancerConfig::builder()
                .backend("a.example.com", 1, None)
                .backend("b.example.com", 1, None)
                .build()
                .unwrap(),
        );

        let transport = MockTransport::new(vec![
            Response::builder()
                .status(429)
                .header("retry-after", "5")
                .body(Bytes::new())
                .unwrap(),
            response(200),
        ]);
        let balancer = BlockingLoadBalancer::new(transport, config.clone());

        let response = balancer.call_blocking(get("https://seed/x")).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(balancer.inner.calls.load(Ordering::SeqCst), 2);

        let throttled = config
            .registry
            .snapshot_all()
            .into_iter()
            .filter(|b| b.is_throttling)
            .count();
        assert_eq!(throttled, 1);
    }

    #[test]
    fn full_exhaustion_returns_synthesized_429() {
        let config = Arc::new(
            LoadBalancerConfig::builder()
                .backend("a.example.com", 1, None)
                .backend("b.example.com", 1, None)
                .build()
                .unwrap(),
        );

        let transport = MockTransport::new(vec![
            Response::builder()
                .status(429)
                .header("retry-after", "4")
                .body(Bytes::new())
                .unwrap(),
            Response::builder()
                .status(429)
                .header("retry-after", "9")
                .body(Bytes::new())
                .unwrap(),
        ]);
        let balancer = BlockingLoadBalancer::new(transport, config);

        let response = balancer.call_blocking(get("https://seed/x")).unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("retry-after").unwrap(), "4");
    }
}
