//! Construction-time configuration and the `LoadBalancerConfig` builder.

use std::time::Duration;

#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
use metrics::{describe_counter, describe_gauge};

use crate::backend::BackendDescriptor;
use crate::error::ConfigError;
use crate::events::{EventListener, EventListeners, FnListener, LoadBalancerEvent};
use crate::registry::BackendRegistry;
use crate::selector::Selector;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Retriable 5xx status codes, pinned per this spec: 500, 502, 503, 504.
/// Other 5xx codes pass through to the caller unchanged.
pub const RETRIABLE_5XX: [u16; 4] = [500, 502, 503, 504];

/// Default `Retry-After` used when a 429/5xx response carries none (or an
/// unparsable one).
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(10);

/// Immutable configuration shared by both load balancer variants.
///
/// Holds the registry (which owns the only shared mutable state), the
/// selector (which owns the seeded PRNG), and the default `Retry-After`
/// used when upstream responses don't supply one.
pub struct LoadBalancerConfig {
    pub(crate) registry: BackendRegistry,
    pub(crate) selector: Selector,
    pub(crate) default_retry_after: Duration,
}

impl LoadBalancerConfig {
    /// Starts a new builder.
    pub fn builder() -> LoadBalancerConfigBuilder {
        LoadBalancerConfigBuilder::new()
    }

    /// Number of configured backends.
    pub fn backend_count(&self) -> usize {
        self.registry.len()
    }

    /// A snapshot of every configured backend's current state, for
    /// introspection and tests. Mirrors the counters a caller would
    /// otherwise only see through the observability events.
    pub fn backend_states(&self) -> Vec<crate::backend::BackendState> {
        self.registry.snapshot_all()
    }
}

/// Builder for [`LoadBalancerConfig`].
///
/// ```
/// use azure_openai_loadbalancer::LoadBalancerConfig;
/// use std::time::Duration;
///
/// let config = LoadBalancerConfig::builder()
///     .backend("eastus.openai.azure.com", 1, None)
///     .backend("westus.openai.azure.com", 2, Some("api-key-2".into()))
///     .default_retry_after(Duration::from_secs(10))
///     .build()
///     .unwrap();
/// assert_eq!(config.backend_count(), 2);
/// ```
pub struct LoadBalancerConfigBuilder {
    backends: Vec<BackendDescriptor>,
    default_retry_after: Duration,
    event_listeners: EventListeners,
}

impl Default for LoadBalancerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadBalancerConfigBuilder {
    /// Creates a new builder with no backends configured.
    pub fn new() -> Self {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "lb_attempts_total",
                    "Total number of dispatch attempts per backend"
                );
                describe_counter!(
                    "lb_backend_throttled_total",
                    "Total number of times a backend was marked throttled"
                );
                describe_gauge!(
                    "lb_backends_available",
                    "Number of backends available for selection as of the last snapshot"
                );
            });
        }

        Self {
            backends: Vec::new(),
            default_retry_after: DEFAULT_RETRY_AFTER,
            event_listeners: EventListeners::new(),
        }
    }

    /// Adds a backend descriptor. `priority` must be positive; `1` is
    /// highest. Validated at [`build`](Self::build) time.
    pub fn backend<S: Into<String>>(
        mut self,
        host: S,
        priority: i64,
        api_key: Option<String>,
    ) -> Self {
        self.backends.push(BackendDescriptor {
            host: host.into(),
            priority,
            api_key,
        });
        self
    }

    /// Sets the `Retry-After` used when a 429/5xx response is missing one or
    /// carries an unparsable value. Defaults to 10 seconds.
    pub fn default_retry_after(mut self, duration: Duration) -> Self {
        self.default_retry_after = duration;
        self
    }

    /// Registers a listener invoked for every observability event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&LoadBalancerEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Registers a listener object implementing [`EventListener`].
    pub fn add_listener<L>(mut self, listener: L) -> Self
    where
        L: EventListener + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Validates and builds the configuration.
    ///
    /// Fails synchronously if no backends were configured, or if any
    /// backend has a non-positive priority.
    pub fn build(self) -> Result<LoadBalancerConfig, ConfigError> {
        if self.backends.is_empty() {
            return Err(ConfigError::EmptyBackendList);
        }

        for backend in &self.backends {
            if backend.priority <= 0 {
                return Err(ConfigError::NonPositivePriority {
                    host: backend.host.clone(),
                    priority: backend.priority,
                });
            }
        }

        let registry = BackendRegistry::new(self.backends, self.event_listeners);

        Ok(LoadBalancerConfig {
            registry,
            selector: Selector::new(),
            default_retry_after: self.default_retry_after,
        })
    }
}
