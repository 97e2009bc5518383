//! Observability events emitted by the load balancer.
//!
//! Mirrors the event-listener pattern used across this crate's siblings: a
//! small event enum, a trait for listeners, and a panic-isolating broadcast
//! collection. The logger is optional and its absence must not alter
//! behavior (spec: "The logger is optional; absence must not alter
//! behavior").

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

#[cfg(feature = "metrics")]
use metrics::counter;

/// An observability event raised by the routing transport or registry.
#[derive(Debug, Clone)]
pub enum LoadBalancerEvent {
    /// A request was dispatched to a backend; carries the resulting status.
    AttemptDispatched {
        host: String,
        status: u16,
        timestamp: Instant,
    },
    /// A backend was marked throttled after a 429/5xx response.
    BackendThrottled {
        host: String,
        retry_after_seconds: u64,
        timestamp: Instant,
    },
    /// A backend's throttle window lapsed, or a success cleared it.
    BackendRecovered { host: String, timestamp: Instant },
    /// Every configured backend was throttled at selection time.
    NoBackendsAvailable {
        soonest_host: String,
        retry_after_seconds: u64,
        timestamp: Instant,
    },
}

impl LoadBalancerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::AttemptDispatched { .. } => "attempt_dispatched",
            Self::BackendThrottled { .. } => "backend_throttled",
            Self::BackendRecovered { .. } => "backend_recovered",
            Self::NoBackendsAvailable { .. } => "no_backends_available",
        }
    }
}

/// Trait for listening to load balancer events.
pub trait EventListener: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &LoadBalancerEvent);
}

type BoxedEventListener = Arc<dyn EventListener>;

/// A collection of event listeners, invoked in registration order.
#[derive(Clone, Default)]
pub struct EventListeners {
    listeners: Vec<BoxedEventListener>,
}

impl EventListeners {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to every registered listener.
    ///
    /// A panicking listener is caught so the remaining listeners still run;
    /// this keeps a misbehaving logger from corrupting the registry mutation
    /// it was only meant to observe.
    pub fn emit(&self, event: &LoadBalancerEvent) {
        for listener in &self.listeners {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));

            if result.is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    event_type = event.event_type(),
                    "load balancer event listener panicked"
                );

                #[cfg(feature = "metrics")]
                counter!("lb_event_listener_panics_total", "event_type" => event.event_type())
                    .increment(1);
            }
        }

        #[cfg(feature = "tracing")]
        log_event(event);
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

#[cfg(feature = "tracing")]
fn log_event(event: &LoadBalancerEvent) {
    match event {
        LoadBalancerEvent::AttemptDispatched { host, status, .. } => {
            tracing::info!(host = %host, status, "attempt dispatched")
        }
        LoadBalancerEvent::BackendThrottled {
            host,
            retry_after_seconds,
            ..
        } => tracing::info!(host = %host, retry_after_seconds, "backend throttled"),
        LoadBalancerEvent::BackendRecovered { host, .. } => {
            tracing::info!(host = %host, "backend recovered")
        }
        LoadBalancerEvent::NoBackendsAvailable {
            soonest_host,
            retry_after_seconds,
            ..
        } => tracing::info!(
            soonest_host = %soonest_host,
            retry_after_seconds,
            "no backends available"
        ),
    }
}

/// A simple function-based event listener, for `on_event`-style builder hooks.
pub struct FnListener<F>
where
    F: Fn(&LoadBalancerEvent) + Send + Sync,
{
    f: F,
}

impl<F> FnListener<F>
where
    F: Fn(&LoadBalancerEvent) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventListener for FnListener<F>
where
    F: Fn(&LoadBalancerEvent) + Send + Sync,
{
    fn on_event(&self, event: &LoadBalancerEvent) {
        (self.f)(event)
    }
}

impl fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn listeners_are_called_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);

        let mut listeners = EventListeners::new();
        listeners.add(FnListener::new(move |_event: &LoadBalancerEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        let event = LoadBalancerEvent::BackendRecovered {
            host: "a".into(),
            timestamp: Instant::now(),
        };

        listeners.emit(&event);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        listeners.emit(&event);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);

        let mut listeners = EventListeners::new();
        listeners.add(FnListener::new(|_: &LoadBalancerEvent| panic!("boom")));
        listeners.add(FnListener::new(move |_: &LoadBalancerEvent| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        let event = LoadBalancerEvent::BackendRecovered {
            host: "a".into(),
            timestamp: Instant::now(),
        };

        listeners.emit(&event);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn listener_panic_increments_metric() {
        use metrics::set_global_recorder;
        use metrics_util::debugging::{DebugValue, DebuggingRecorder};
        use std::sync::LazyLock;

        static RECORDER: LazyLock<DebuggingRecorder> = LazyLock::new(DebuggingRecorder::default);
        let _ = set_global_recorder(&*RECORDER);

        let mut listeners = EventListeners::new();
        listeners.add(FnListener::new(|_: &LoadBalancerEvent| panic!("boom")));

        listeners.emit(&LoadBalancerEvent::BackendRecovered {
            host: "a".into(),
            timestamp: Instant::now(),
        });

        let snapshot = RECORDER.snapshotter().snapshot().into_vec();
        let found = snapshot.iter().any(|(key, _, _, value)| {
            key.key().name() == "lb_event_listener_panics_total"
                && matches!(value, DebugValue::Counter(_))
        });
        assert!(found, "expected panic counter to be recorded");
    }
}
