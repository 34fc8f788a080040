//! Tower layer for the timeout supervisor.

use crate::config::{TimeoutConfig, TimeoutConfigBuilder};
use crate::Timeout;
use std::sync::Arc;
use std::time::Duration;
use tower::layer::Layer;

/// A Tower layer that bounds every attempt by a deadline.
#[derive(Clone)]
pub struct TimeoutLayer {
    config: Arc<TimeoutConfig>,
}

impl TimeoutLayer {
    /// Creates a layer with the given deadline and default settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use tower_fault_tolerance_timeout::TimeoutLayer;
    /// use std::time::Duration;
    ///
    /// let layer = TimeoutLayer::new(Duration::from_millis(500));
    /// ```
    pub fn new(duration: Duration) -> Self {
        TimeoutConfig::builder().timeout_duration(duration).build()
    }

    /// Creates a new builder for configuring a timeout layer.
    ///
    /// # Examples
    ///
    /// ```
    /// use tower_fault_tolerance_timeout::TimeoutLayer;
    /// use std::time::Duration;
    ///
    /// let layer = TimeoutLayer::builder()
    ///     .timeout_duration(Duration::from_millis(500))
    ///     .cancel_running_attempt(false)
    ///     .name("serviceC")
    ///     .build();
    /// ```
    pub fn builder() -> TimeoutConfigBuilder {
        TimeoutConfig::builder()
    }
}

impl From<TimeoutConfig> for TimeoutLayer {
    fn from(config: TimeoutConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = Timeout<S>;

    fn layer(&self, service: S) -> Self::Service {
        Timeout::new(service, Arc::clone(&self.config))
    }
}
