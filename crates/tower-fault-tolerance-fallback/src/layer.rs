//! Tower layer for fallback.

use crate::config::{FallbackConfig, FallbackConfigBuilder};
use crate::provider::FallbackProvider;
use crate::Fallback;
use std::future::Future;
use std::sync::Arc;
use tower::layer::Layer;

/// A Tower layer that substitutes a fallback response for terminal failures.
///
/// See the [module-level documentation](crate) for usage examples.
pub struct FallbackLayer<Req, Res, E, F> {
    config: Arc<FallbackConfig<Req, Res, E, F>>,
}

impl<Req, Res, E, F> FallbackLayer<Req, Res, E, F> {
    /// Creates a new fallback layer from the given configuration.
    pub fn new(config: FallbackConfig<Req, Res, E, F>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a fallback layer.
    pub fn builder() -> FallbackConfigBuilder<Req, Res, E, F> {
        FallbackConfigBuilder::new()
    }

    /// Creates a fallback layer around a custom provider.
    pub fn provider<P>(provider: P) -> Self
    where
        P: FallbackProvider<Req, E, Response = Res, Error = F> + 'static,
    {
        FallbackConfigBuilder::new().provider(provider).build()
    }
}

impl<Req, Res, E, F> FallbackLayer<Req, Res, E, F>
where
    Req: 'static,
    Res: Clone + Send + Sync + 'static,
    E: 'static,
    F: Send + 'static,
{
    /// Creates a fallback layer that returns a fixed value on failure.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tower_fault_tolerance_fallback::FallbackLayer;
    /// use std::convert::Infallible;
    ///
    /// # #[derive(Debug, Clone)]
    /// # struct MyError;
    /// let layer = FallbackLayer::<String, String, MyError, Infallible>::value("fallback".to_string());
    /// ```
    pub fn value(value: Res) -> Self {
        FallbackConfigBuilder::new().value(value).build()
    }

    /// Creates a fallback layer that builds a fresh value on each failure.
    pub fn value_fn<C>(f: C) -> Self
    where
        C: Fn() -> Res + Send + Sync + 'static,
    {
        FallbackConfigBuilder::new().value_fn(f).build()
    }

    /// Creates a fallback layer that computes a response from the request.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tower_fault_tolerance_fallback::FallbackLayer;
    /// use std::convert::Infallible;
    ///
    /// # #[derive(Debug, Clone)]
    /// # struct MyError;
    /// let layer = FallbackLayer::<String, String, MyError, Infallible>::from_request(|req| {
    ///     format!("cached: {}", req)
    /// });
    /// ```
    pub fn from_request<C>(f: C) -> Self
    where
        C: Fn(&Req) -> Res + Send + Sync + 'static,
    {
        FallbackConfigBuilder::new().from_request(f).build()
    }

    /// Creates a fallback layer that computes a response from request and error.
    pub fn from_request_error<C>(f: C) -> Self
    where
        C: Fn(&Req, &E) -> Res + Send + Sync + 'static,
    {
        FallbackConfigBuilder::new().from_request_error(f).build()
    }

    /// Creates a fallback layer that routes to a backup operation.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tower_fault_tolerance_fallback::FallbackLayer;
    ///
    /// # #[derive(Debug, Clone)]
    /// # struct MyError;
    /// let layer = FallbackLayer::<String, String, MyError, MyError>::service(|req: String| async move {
    ///     Ok::<_, MyError>(format!("backup: {}", req))
    /// });
    /// ```
    pub fn service<C, Fut>(backup: C) -> Self
    where
        C: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, F>> + Send + 'static,
    {
        FallbackConfigBuilder::new().service(backup).build()
    }
}

impl<Req, Res, E, F> Clone for FallbackLayer<Req, Res, E, F> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req, Res, E, F> Layer<S> for FallbackLayer<Req, Res, E, F> {
    type Service = Fallback<S, Req, Res, E, F>;

    fn layer(&self, service: S) -> Self::Service {
        Fallback::new(service, Arc::clone(&self.config))
    }
}
