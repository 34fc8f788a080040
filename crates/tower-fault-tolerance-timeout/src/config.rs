//! Configuration for the timeout supervisor.

use crate::events::TimeoutEvent;
use std::time::Duration;
use tower_fault_tolerance_core::{EventListeners, FnListener};

/// Configuration for the timeout supervisor.
pub struct TimeoutConfig {
    pub(crate) timeout_duration: Option<Duration>,
    pub(crate) cancel_running_attempt: bool,
    pub(crate) event_listeners: EventListeners<TimeoutEvent>,
    pub(crate) name: String,
}

impl TimeoutConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> TimeoutConfigBuilder {
        TimeoutConfigBuilder::new()
    }

    /// Creates a layer from this configuration.
    pub fn layer(self) -> crate::TimeoutLayer {
        crate::TimeoutLayer::from(self)
    }

    /// The configured deadline, if any.
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout_duration
    }
}

/// Builder for configuring and constructing a timeout supervisor.
pub struct TimeoutConfigBuilder {
    timeout_duration: Option<Duration>,
    cancel_running_attempt: bool,
    event_listeners: EventListeners<TimeoutEvent>,
    name: String,
}

impl TimeoutConfigBuilder {
    /// Creates a new builder with default values.
    ///
    /// Defaults:
    /// - timeout_duration: none (attempts run to completion)
    /// - cancel_running_attempt: true
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            timeout_duration: None,
            cancel_running_attempt: true,
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the per-attempt deadline.
    pub fn timeout_duration(mut self, duration: Duration) -> Self {
        self.timeout_duration = Some(duration);
        self
    }

    /// Sets or clears the per-attempt deadline.
    ///
    /// `None` disables supervision: attempts run to completion and their
    /// results pass through unchanged.
    pub fn timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// Sets whether a timed-out attempt is dropped in addition to being
    /// signaled through its cancellation token.
    ///
    /// When true, the attempt future is dropped at the deadline. When false,
    /// the attempt keeps running on its own task; its cancellation token is
    /// cancelled and its eventual result is discarded.
    ///
    /// Default: true
    pub fn cancel_running_attempt(mut self, cancel: bool) -> Self {
        self.cancel_running_attempt = cancel;
        self
    }

    /// Sets the name of this instance for observability.
    ///
    /// Default: `"<unnamed>"`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked when an attempt succeeds within its deadline.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeoutEvent::Success { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback invoked when an attempt fails within its deadline.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeoutEvent::Error { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback invoked with the attempt number when an attempt
    /// times out.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let TimeoutEvent::Timeout { attempt, .. } = event {
                f(*attempt);
            }
        }));
        self
    }

    /// Registers a listener for every timeout event.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&TimeoutEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    /// Builds the configuration.
    pub fn build_config(self) -> TimeoutConfig {
        TimeoutConfig {
            timeout_duration: self.timeout_duration,
            cancel_running_attempt: self.cancel_running_attempt,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }

    /// Builds the timeout layer.
    pub fn build(self) -> crate::TimeoutLayer {
        self.build_config().layer()
    }
}

impl Default for TimeoutConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
