use crate::backoff::{ExponentialBackoff, FixedInterval, IntervalFunction, JitteredInterval};
use crate::events::{AbortReason, RetryEvent};
use crate::policy::{RetryPolicy, RetryPredicate};
use std::sync::Arc;
use std::time::Duration;
use tower_fault_tolerance_core::{EventListeners, FnListener};

/// Configuration for the retry middleware.
///
/// `E` is the error type of the wrapped service, which is what the retry
/// predicates inspect.
pub struct RetryConfig<E> {
    pub(crate) policy: RetryPolicy<E>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl<E> RetryConfig<E> {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    /// Creates a layer from this configuration.
    pub fn layer(self) -> crate::RetryLayer<E> {
        crate::RetryLayer::from(self)
    }

    /// The retry policy.
    pub fn policy(&self) -> &RetryPolicy<E> {
        &self.policy
    }

    /// The instance name used in events, logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<E> {
    max_retries: usize,
    interval_fn: Option<Arc<dyn IntervalFunction>>,
    retry_predicate: Option<RetryPredicate<E>>,
    abort_predicate: Option<RetryPredicate<E>>,
    max_duration: Option<Duration>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RetryConfigBuilder<E> {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_retries: 3
    /// - backoff: none (retries start immediately)
    /// - max_duration: unbounded
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            interval_fn: None,
            retry_predicate: None,
            abort_predicate: None,
            max_duration: None,
            event_listeners: EventListeners::new(),
            name: "<unnamed>".to_string(),
        }
    }

    /// Sets how many times a failed invocation is retried.
    ///
    /// The first attempt does not count, so `max_retries(2)` allows up to
    /// three attempts and `max_retries(0)` disables retrying.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Waits a fixed `delay` before each retry.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.interval_fn = Some(Arc::new(FixedInterval::new(delay)));
        self
    }

    /// Waits `delay` randomized by up to `jitter` either way before each
    /// retry. The result is clamped at zero.
    pub fn delay_with_jitter(mut self, delay: Duration, jitter: Duration) -> Self {
        self.interval_fn = Some(Arc::new(JitteredInterval::fixed(delay, jitter)));
        self
    }

    /// Doubles the delay after every retry, starting at `initial_interval`.
    pub fn exponential_backoff(mut self, initial_interval: Duration) -> Self {
        self.interval_fn = Some(Arc::new(ExponentialBackoff::new(initial_interval)));
        self
    }

    /// Sets a custom interval function.
    pub fn backoff<I>(mut self, interval_fn: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval_fn = Some(Arc::new(interval_fn));
        self
    }

    /// Bounds the total time spent on one invocation, attempts and delays
    /// included. A retry that would start at or after the bound is not made.
    pub fn max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    /// Only retries errors for which `predicate` returns true.
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retry_predicate = Some(Arc::new(predicate));
        self
    }

    /// Never retries errors for which `predicate` returns true.
    ///
    /// Takes precedence over [`retry_on`](Self::retry_on).
    pub fn abort_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.abort_predicate = Some(Arc::new(predicate));
        self
    }

    /// Sets the name for this retry instance.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked before each retry.
    ///
    /// Receives the number of the attempt that just failed (1 for the first
    /// attempt) and the delay before the next one.
    ///
    /// # Example
    /// ```rust,no_run
    /// use tower_fault_tolerance_retry::RetryLayer;
    /// use std::time::Duration;
    ///
    /// let layer = RetryLayer::<std::io::Error>::builder()
    ///     .max_retries(2)
    ///     .delay(Duration::from_millis(50))
    ///     .on_retry(|attempt, delay| {
    ///         println!("attempt {} failed, retrying in {:?}", attempt, delay);
    ///     })
    ///     .build();
    /// ```
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked with the total number of attempts when
    /// an attempt succeeds.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked with the total number of attempts when
    /// the last permitted attempt fails.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Exhausted { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when retrying stops early.
    pub fn on_aborted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, AbortReason) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Aborted {
                attempts, reason, ..
            } = event
            {
                f(*attempts, *reason);
            }
        }));
        self
    }

    /// Registers a listener for every retry event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Builds the configuration.
    pub fn build_config(self) -> RetryConfig<E> {
        let interval_fn = self
            .interval_fn
            .unwrap_or_else(|| Arc::new(FixedInterval::none()));

        let policy = RetryPolicy {
            max_retries: self.max_retries,
            interval_fn,
            retry_predicate: self.retry_predicate,
            abort_predicate: self.abort_predicate,
            max_duration: self.max_duration,
        };

        RetryConfig {
            policy,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds the retry layer.
    pub fn build(self) -> crate::RetryLayer<E> {
        self.build_config().layer()
    }
}
