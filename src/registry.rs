//! Backend registry: the sole shared mutable state in this crate.
//!
//! A single `std::sync::Mutex` guards every descriptor's throttling fields
//! and counters. No operation here ever waits for a state change — waits
//! are owned by the upstream client's own backoff — so a plain mutex with
//! no condition variable is sufficient, the same discipline
//! `SharedRateLimiter` uses for its window state.

use std::sync::Mutex;
use std::time::Instant;

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::backend::{BackendDescriptor, BackendState};
use crate::events::{EventListeners, LoadBalancerEvent};

/// One non-throttled backend available for selection, with its priority.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AvailableBackend {
    pub index: usize,
    pub priority: u32,
}

/// Result of a registry snapshot: either some backends are available, or
/// every configured backend is throttled and the soonest recovery instant
/// is returned for the caller to compute a `Retry-After`.
pub(crate) struct Snapshot {
    pub available: Vec<AvailableBackend>,
    pub soonest_retry_after: Option<Instant>,
}

/// The registry of configured backends and their throttling state.
pub struct BackendRegistry {
    backends: Mutex<Vec<BackendState>>,
    events: EventListeners,
}

impl BackendRegistry {
    /// Builds a registry from descriptors already validated to have a
    /// positive priority (see
    /// [`crate::config::LoadBalancerConfigBuilder::build`]).
    pub(crate) fn new(descriptors: Vec<BackendDescriptor>, events: EventListeners) -> Self {
        let backends = descriptors
            .into_iter()
            .map(|d| BackendState::new(d.host, d.priority as u32, d.api_key))
            .collect();
        Self {
            backends: Mutex::new(backends),
            events,
        }
    }

    /// Number of configured backends.
    pub fn len(&self) -> usize {
        self.backends.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a clone of the current state of every configured backend.
    pub fn snapshot_all(&self) -> Vec<BackendState> {
        self.backends.lock().unwrap().clone()
    }

    /// Host for a given index, used when rewriting outbound requests.
    pub(crate) fn host(&self, index: usize) -> String {
        self.backends.lock().unwrap()[index].host.clone()
    }

    /// API key for a given index, if configured.
    pub(crate) fn api_key(&self, index: usize) -> Option<String> {
        self.backends.lock().unwrap()[index].api_key.clone()
    }

    /// Clears expired throttles, then returns the set of currently
    /// available backends (or the soonest recovery instant if none).
    pub(crate) fn snapshot_available(&self, now: Instant) -> Snapshot {
        let mut guard = self.backends.lock().unwrap();

        for backend in guard.iter_mut() {
            if backend.is_throttling {
                if let Some(retry_after) = backend.retry_after {
                    if now >= retry_after {
                        backend.is_throttling = false;
                        backend.retry_after = None;
                        self.events.emit(&LoadBalancerEvent::BackendRecovered {
                            host: backend.host.clone(),
                            timestamp: now,
                        });
                    }
                }
            }
        }

        let mut available = Vec::new();
        let mut soonest_retry_after: Option<Instant> = None;

        for (index, backend) in guard.iter().enumerate() {
            if backend.is_throttling {
                if let Some(retry_after) = backend.retry_after {
                    soonest_retry_after = Some(match soonest_retry_after {
                        Some(current) if current <= retry_after => current,
                        _ => retry_after,
                    });
                }
            } else {
                available.push(AvailableBackend {
                    index,
                    priority: backend.priority,
                });
            }
        }

        #[cfg(feature = "metrics")]
        gauge!("lb_backends_available").set(available.len() as f64);

        Snapshot {
            available,
            soonest_retry_after,
        }
    }

    /// Marks a backend throttled until `now + retry_after_seconds`.
    /// Idempotent with respect to repeated 429s: the latest call wins.
    pub(crate) fn mark_throttled(&self, index: usize, retry_after_seconds: u64, now: Instant) {
        let host = {
            let mut guard = self.backends.lock().unwrap();
            let backend = &mut guard[index];
            backend.is_throttling = true;
            backend.retry_after = Some(now + std::time::Duration::from_secs(retry_after_seconds));
            backend.host.clone()
        };

        #[cfg(feature = "metrics")]
        counter!("lb_backend_throttled_total", "host" => host.clone()).increment(1);

        self.events.emit(&LoadBalancerEvent::BackendThrottled {
            host,
            retry_after_seconds,
            timestamp: now,
        });
    }

    /// Records a successful response: clears throttling and increments the
    /// success counter.
    pub(crate) fn record_success(&self, index: usize) {
        let mut guard = self.backends.lock().unwrap();
        let backend = &mut guard[index];
        backend.is_throttling = false;
        backend.retry_after = None;
        backend.successful_call_count += 1;
    }

    /// Increments the attempt counter for a backend.
    pub(crate) fn record_attempt(&self, index: usize) {
        let mut guard = self.backends.lock().unwrap();
        let backend = &mut guard[index];
        backend.attempts += 1;

        #[cfg(feature = "metrics")]
        {
            let host = backend.host.clone();
            drop(guard);
            counter!("lb_attempts_total", "host" => host).increment(1);
        }
    }

    pub(crate) fn emit(&self, event: &LoadBalancerEvent) {
        self.events.emit(event);
    }
}
