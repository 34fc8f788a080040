use crate::config::{RetryConfig, RetryConfigBuilder};
use crate::Retry;
use std::sync::Arc;
use tower::layer::Layer;

/// A Tower [`Layer`] that applies bounded retry to a service of attempts.
pub struct RetryLayer<E> {
    config: Arc<RetryConfig<E>>,
}

impl<E> RetryLayer<E> {
    /// Creates a layer from a shared configuration.
    pub fn new(config: impl Into<Arc<RetryConfig<E>>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    /// Creates a new builder for configuring a retry layer.
    ///
    /// # Examples
    ///
    /// ```
    /// use tower_fault_tolerance_retry::RetryLayer;
    /// use std::time::Duration;
    ///
    /// let layer = RetryLayer::<std::io::Error>::builder()
    ///     .max_retries(2)
    ///     .delay(Duration::from_millis(100))
    ///     .name("serviceB")
    ///     .build();
    /// ```
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }
}

impl<E> From<RetryConfig<E>> for RetryLayer<E> {
    fn from(config: RetryConfig<E>) -> Self {
        Self::new(config)
    }
}

impl<E> Clone for RetryLayer<E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, E> Layer<S> for RetryLayer<E> {
    type Service = Retry<S, E>;

    fn layer(&self, service: S) -> Self::Service {
        Retry::new(service, Arc::clone(&self.config))
    }
}
