//! Shared routing state machine.
//!
//! Both transport variants (`async_balancer`, `blocking`) drive the same
//! SELECT -> DISPATCH -> INTERPRET loop against a `RoutingCore`; only the
//! dispatch primitive differs (one suspending, one blocking). This module
//! owns request rewriting, response interpretation, and 429 synthesis so
//! neither variant duplicates that logic.

use std::time::Instant;

use bytes::Bytes;
use http::{HeaderValue, Request, Response, StatusCode};

use crate::config::{LoadBalancerConfig, RETRIABLE_5XX};
use crate::events::LoadBalancerEvent;
use crate::selector::Selection;

/// What the caller should do after one iteration of the state machine.
pub(crate) enum StepOutcome {
    /// The selected backend should be dispatched to; rewrite applied.
    Dispatch {
        index: usize,
        request: Request<Bytes>,
    },
    /// No backend is available; this synthesized response is final.
    Return(Response<Bytes>),
}

/// What to do after interpreting a response from a dispatched backend.
pub(crate) enum InterpretOutcome {
    /// Terminal: return this response to the caller.
    Return(Response<Bytes>),
    /// Retriable: loop back to SELECT.
    Retry,
}

/// The SELECT step: choose a backend, rewriting the request onto it, or
/// synthesize the exhaustion response.
pub(crate) fn select_and_rewrite(
    config: &LoadBalancerConfig,
    request: &Request<Bytes>,
    now: Instant,
) -> StepOutcome {
    match config.selector.select(&config.registry, now) {
        Selection::Attempt(index) => {
            config.registry.record_attempt(index);
            let host = config.registry.host(index);
            let api_key = config.registry.api_key(index);
            let rewritten = rewrite_request(request, &host, api_key.as_deref());
            StepOutcome::Dispatch {
                index,
                request: rewritten,
            }
        }
        Selection::NoneAvailable {
            retry_after_seconds,
        } => {
            let soonest_host = soonest_host_hint(config);
            config
                .registry
                .emit(&LoadBalancerEvent::NoBackendsAvailable {
                    soonest_host,
                    retry_after_seconds,
                    timestamp: now,
                });
            StepOutcome::Return(synthesize_429(retry_after_seconds))
        }
    }
}

/// Best-effort host name to attach to the `NoBackendsAvailable` event; not
/// load-bearing for correctness, only observability.
fn soonest_host_hint(config: &LoadBalancerConfig) -> String {
    config
        .registry
        .snapshot_all()
        .into_iter()
        .min_by_key(|b| b.retry_after)
        .map(|b| b.host)
        .unwrap_or_default()
}

/// Rewrites a request to target `host`, per the bit-exact contract in
/// the request rewriting section: scheme forced to https, host replaced,
/// path/query/fragment preserved, `Host` header replaced, and `api-key`
/// substituted for `Authorization` when the backend has a key configured.
pub(crate) fn rewrite_request(
    request: &Request<Bytes>,
    host: &str,
    api_key: Option<&str>,
) -> Request<Bytes> {
    let mut parts = request.uri().clone().into_parts();
    let path_and_query = parts
        .path_and_query
        .take()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let new_uri: http::Uri = format!("https://{host}{path_and_query}")
        .parse()
        .expect("rewritten URI is well-formed");

    let mut builder = Request::builder().method(request.method().clone()).uri(new_uri);

    for (name, value) in request.headers() {
        if name == http::header::HOST {
            continue;
        }
        if api_key.is_some() && name == http::header::AUTHORIZATION {
            continue;
        }
        builder = builder.header(name, value);
    }

    builder = builder.header(
        http::header::HOST,
        HeaderValue::from_str(host).unwrap_or_else(|_| HeaderValue::from_static("")),
    );

    if let Some(key) = api_key {
        if let Ok(value) = HeaderValue::from_str(key) {
            builder = builder.header("api-key", value);
        }
    }

    builder
        .body(request.body().clone())
        .expect("rewritten request is well-formed")
}

/// The INTERPRET step: examine a dispatched response and decide whether to
/// return it or retry.
pub(crate) fn interpret_response(
    config: &LoadBalancerConfig,
    index: usize,
    host: &str,
    response: Response<Bytes>,
    now: Instant,
) -> InterpretOutcome {
    let status = response.status();

    config.registry.emit(&LoadBalancerEvent::AttemptDispatched {
        host: host.to_string(),
        status: status.as_u16(),
        timestamp: now,
    });

    if status.is_success() {
        config.registry.record_success(index);
        return InterpretOutcome::Return(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_seconds = parse_retry_after(&response).unwrap_or(config.default_retry_after.as_secs());
        config
            .registry
            .mark_throttled(index, retry_after_seconds.max(1), now);
        return InterpretOutcome::Retry;
    }

    if RETRIABLE_5XX.contains(&status.as_u16()) {
        config
            .registry
            .mark_throttled(index, config.default_retry_after.as_secs(), now);
        return InterpretOutcome::Retry;
    }

    InterpretOutcome::Return(response)
}

fn parse_retry_after(response: &Response<Bytes>) -> Option<u64> {
    response
        .headers()
        .get(http::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}

/// Synthesizes the terminal 429 returned when every configured backend is
/// throttled.
pub(crate) fn synthesize_429(retry_after_seconds: u64) -> Response<Bytes> {
    let body = Bytes::from_static(b"Too Many Requests");
    Response::builder()
        .status(StatusCode::TOO_MANY_REQUESTS)
        .header(http::header::RETRY_AFTER, retry_after_seconds.to_string())
        .header(
            http::header::CONTENT_TYPE,
            "text/plain; charset=utf-8",
        )
        .body(body)
        .expect("synthesized response is well-formed")
}
