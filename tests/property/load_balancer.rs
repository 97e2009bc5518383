//! Property tests for the load balancer's routing invariants.
//!
//! Invariants tested:
//! - A single call never dispatches more times than there are backends
//! - Selection within a same-priority tier is roughly uniform

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use azure_openai_loadbalancer::{AsyncLoadBalancer, LoadBalancerConfig};
use bytes::Bytes;
use http::{Request, Response, StatusCode};
use proptest::prelude::*;
use tokio::runtime::Runtime;
use tower::{service_fn, Service};

fn get(uri: &str) -> Request<Bytes> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
}

fn throttled(retry_after_seconds: u64) -> Response<Bytes> {
    Response::builder()
        .status(StatusCode::TOO_MANY_REQUESTS)
        .header("retry-after", retry_after_seconds.to_string())
        .body(Bytes::new())
        .unwrap()
}

fn success() -> Response<Bytes> {
    Response::builder()
        .status(StatusCode::OK)
        .body(Bytes::new())
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// One call dispatches at most once per configured backend before the
    /// pool is exhausted and the synthesized 429 is returned.
    #[test]
    fn dispatch_count_never_exceeds_backend_count(backend_count in 1usize..=8) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let mut builder = LoadBalancerConfig::builder();
            for i in 0..backend_count {
                builder = builder.backend(format!("backend-{i}"), 1, None);
            }
            let config = Arc::new(builder.build().unwrap());

            let calls = Arc::new(AtomicUsize::new(0));
            let calls_clone = Arc::clone(&calls);
            let transport = service_fn(move |_req: Request<Bytes>| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, std::convert::Infallible>(throttled(30)) }
            });

            let mut balancer = AsyncLoadBalancer::new(transport, config);
            let response = balancer.call(get("https://seed/x")).await.unwrap();

            prop_assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
            prop_assert_eq!(calls.load(Ordering::SeqCst), backend_count);
            Ok(())
        })?;
    }

    /// Selection within a same-priority tier is roughly uniform across a
    /// large number of independent calls.
    #[test]
    fn tier_selection_is_roughly_uniform(backend_count in 2usize..=5) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let mut builder = LoadBalancerConfig::builder();
            for i in 0..backend_count {
                builder = builder.backend(format!("backend-{i}"), 1, None);
            }
            let config = Arc::new(builder.build().unwrap());

            let transport = service_fn(move |_req: Request<Bytes>| async move {
                Ok::<_, std::convert::Infallible>(success())
            });
            let mut balancer = AsyncLoadBalancer::new(transport, config.clone());

            let iterations = 600usize;
            for _ in 0..iterations {
                balancer.call(get("https://seed/x")).await.unwrap();
            }

            let expected = iterations as f64 / backend_count as f64;
            for state in config.backend_states() {
                let fraction = state.attempts as f64 / expected;
                prop_assert!(
                    (0.5..1.5).contains(&fraction),
                    "backend {} got {} of {} attempts (expected ~{})",
                    state.host,
                    state.attempts,
                    iterations,
                    expected
                );
            }
            Ok(())
        })?;
    }
}
