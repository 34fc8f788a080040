//! Fallback dispatch for Tower services.
//!
//! [`Fallback`] wraps a service and, when it fails, calls a
//! [`FallbackProvider`] with the original request instead of surfacing the
//! error. The provider is called at most once per request and only after the
//! inner service has failed; it is neither retried nor time-bounded, and its
//! own failure is returned as [`FallbackError::FallbackFailed`].
//!
//! Placed outside a retry layer, the fallback only ever sees the terminal
//! failure of the whole retry sequence.
//!
//! # Examples
//!
//! ```
//! use tower_fault_tolerance_fallback::FallbackLayer;
//! use tower::{Layer, Service, ServiceExt, service_fn};
//! use std::convert::Infallible;
//!
//! # async fn example() {
//! let layer = FallbackLayer::<String, String, &'static str, Infallible>::builder()
//!     .name("serviceA")
//!     .value("fallback".to_string())
//!     .handle(|e| e.starts_with("Connection"))
//!     .build();
//!
//! let svc = service_fn(|_req: String| async { Err::<String, _>("Connection failed") });
//! let mut service = layer.layer(svc);
//!
//! let response = service.ready().await.unwrap().call("req".to_string()).await;
//! assert_eq!(response, Ok("fallback".to_string()));
//! # }
//! ```

mod config;
mod error;
mod events;
mod layer;
mod provider;

pub use config::{FallbackConfig, FallbackConfigBuilder, HandlePredicate, SharedProvider};
pub use error::FallbackError;
pub use events::FallbackEvent;
pub use layer::FallbackLayer;
pub use provider::{
    dispatch, FallbackProvider, FallbackStrategy, FromRequestErrorFn, FromRequestFn, ServiceFn,
    ValueFn,
};

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tower::Service;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter};

#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A Tower service that provides a fallback response when the inner service fails.
///
/// See the [module-level documentation](crate) for usage examples.
pub struct Fallback<S, Req, Res, E, F> {
    inner: S,
    config: Arc<FallbackConfig<Req, Res, E, F>>,
}

impl<S, Req, Res, E, F> Fallback<S, Req, Res, E, F> {
    /// Creates a new `Fallback` service wrapping the given service.
    pub fn new(inner: S, config: Arc<FallbackConfig<Req, Res, E, F>>) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "fallback_calls_total",
                "Total requests by fallback result (success, applied, failed, skipped)"
            );
        });

        Self { inner, config }
    }

    /// Returns a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, Req, Res, E, F> Clone for Fallback<S, Req, Res, E, F>
where
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, Req, Res, E, F> Service<Req> for Fallback<S, Req, Res, E, F>
where
    S: Service<Req, Response = Res, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    Req: Clone + Send + 'static,
    Res: Send + 'static,
    E: Send + 'static,
    F: Send + 'static,
{
    type Response = Res;
    type Error = FallbackError<E, F>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(FallbackError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let clone = self.inner.clone();
        let mut service = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);
        let original = req.clone();
        let future = service.call(req);

        Box::pin(async move {
            let error = match future.await {
                Ok(response) => {
                    config.event_listeners.emit(&FallbackEvent::Success {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                    });

                    #[cfg(feature = "metrics")]
                    counter!("fallback_calls_total", "fallback" => config.name.clone(), "result" => "success")
                        .increment(1);

                    return Ok(response);
                }
                Err(error) => error,
            };

            let provider = match &config.provider {
                Some(provider) if config.handles(&error) => provider,
                _ => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(fallback = %config.name, "Error not handled, propagating");

                    #[cfg(feature = "metrics")]
                    counter!("fallback_calls_total", "fallback" => config.name.clone(), "result" => "skipped")
                        .increment(1);

                    config.event_listeners.emit(&FallbackEvent::Skipped {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                    });
                    return Err(FallbackError::Inner(error));
                }
            };

            config.event_listeners.emit(&FallbackEvent::FailedAttempt {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
            });

            let strategy = provider.kind();

            #[cfg(feature = "tracing")]
            tracing::debug!(fallback = %config.name, strategy, "Applying fallback");

            match dispatch(error, Some(provider.as_ref()), original).await {
                Ok(response) => {
                    #[cfg(feature = "metrics")]
                    counter!(
                        "fallback_calls_total",
                        "fallback" => config.name.clone(),
                        "result" => "applied",
                        "strategy" => strategy
                    )
                    .increment(1);

                    config.event_listeners.emit(&FallbackEvent::Applied {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        strategy,
                    });
                    Ok(response)
                }
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(fallback = %config.name, strategy, "Fallback failed");

                    #[cfg(feature = "metrics")]
                    counter!(
                        "fallback_calls_total",
                        "fallback" => config.name.clone(),
                        "result" => "failed",
                        "strategy" => strategy
                    )
                    .increment(1);

                    config.event_listeners.emit(&FallbackEvent::Failed {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                    });
                    Err(error)
                }
            }
        })
    }
}
