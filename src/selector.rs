//! Selector: pure(ish) policy mapping registry state + wall clock to either
//! an attempt or a "nothing available" decision.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::registry::BackendRegistry;

/// Used when the registry is pathologically empty (no backends configured
/// at all, so there is no throttle deadline to report either).
const EMPTY_REGISTRY_SENTINEL_SECONDS: u64 = 10;

/// Outcome of a selection attempt.
pub(crate) enum Selection {
    /// Dispatch should proceed against this backend index.
    Attempt(usize),
    /// No backend is currently available; retry after this many seconds.
    NoneAvailable { retry_after_seconds: u64 },
}

/// Thread-safe, seeded-once PRNG used to break ties within a priority tier.
///
/// Seeded at construction (not reseeded per call), per the design note that
/// selection history is never persisted and each call is independent.
pub(crate) struct Selector {
    rng: Mutex<StdRng>,
}

impl Selector {
    pub(crate) fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Runs the selection algorithm against `registry` at time `now`.
    pub(crate) fn select(&self, registry: &BackendRegistry, now: Instant) -> Selection {
        let snapshot = registry.snapshot_available(now);

        if snapshot.available.is_empty() {
            let retry_after_seconds = match snapshot.soonest_retry_after {
                Some(deadline) if deadline > now => {
                    let remaining = deadline.saturating_duration_since(now);
                    ceil_seconds(remaining).max(1)
                }
                Some(_) => 1,
                None => EMPTY_REGISTRY_SENTINEL_SECONDS,
            };
            return Selection::NoneAvailable {
                retry_after_seconds,
            };
        }

        let min_priority = snapshot
            .available
            .iter()
            .map(|b| b.priority)
            .min()
            .expect("available list is non-empty");

        let tier: Vec<usize> = snapshot
            .available
            .iter()
            .filter(|b| b.priority == min_priority)
            .map(|b| b.index)
            .collect();

        let chosen = if tier.len() == 1 {
            tier[0]
        } else {
            let mut rng = self.rng.lock().unwrap();
            let pick = rng.random_range(0..tier.len());
            tier[pick]
        };

        Selection::Attempt(chosen)
    }
}

fn ceil_seconds(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
