//! Bounded retry middleware for Tower services.
//!
//! [`Retry`] turns a service of [`Attempt`]s into a service of plain
//! requests. Each invocation runs the inner service at most
//! `max_retries + 1` times, handing it a fresh [`Attempt`] each time:
//! attempt numbers start at 1 and every attempt gets its own cancellation
//! token. Attempts are strictly sequential.
//!
//! Retrying stops when:
//! - an attempt succeeds; its value is returned
//! - the last permitted attempt fails ([`RetryError::Exhausted`])
//! - the error is excluded by `retry_on`/`abort_on`, or the next retry would
//!   exceed `max_duration` ([`RetryError::Aborted`])
//!
//! If the inner service fails to become ready before the first attempt, no
//! attempt is made and the failure is returned as [`RetryError::NotReady`].
//!
//! The progression is tracked by [`RetryState`].
//!
//! # Examples
//!
//! ```
//! use tower_fault_tolerance_core::Attempt;
//! use tower_fault_tolerance_retry::RetryLayer;
//! use tower::{Layer, Service, ServiceExt, service_fn};
//!
//! # async fn example() {
//! let layer = RetryLayer::<&'static str>::builder()
//!     .max_retries(2)
//!     .on_retry(|attempt, _| println!("attempt {} failed", attempt))
//!     .build();
//!
//! let svc = service_fn(|attempt: Attempt<()>| async move {
//!     if attempt.number < 3 {
//!         Err("Connection failed")
//!     } else {
//!         Ok("connected")
//!     }
//! });
//!
//! let mut service = layer.layer(svc);
//! let response = service.ready().await.unwrap().call(()).await;
//! assert_eq!(response, Ok("connected"));
//! # }
//! ```

mod backoff;
mod config;
mod error;
mod events;
mod layer;
mod policy;
mod state;

pub use backoff::{
    ExponentialBackoff, FixedInterval, FnInterval, IntervalFunction, JitteredInterval,
};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use error::RetryError;
pub use events::{AbortReason, RetryEvent};
pub use layer::RetryLayer;
pub use policy::{RetryPolicy, RetryPredicate};
pub use state::{FailureTransition, RetryState};

use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tower_fault_tolerance_core::Attempt;

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};

#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A Tower [`Service`] that retries failed attempts of an inner service.
pub struct Retry<S, E> {
    inner: S,
    config: Arc<RetryConfig<E>>,
}

impl<S, E> Retry<S, E> {
    /// Creates a new `Retry` service wrapping the given service.
    pub fn new(inner: S, config: Arc<RetryConfig<E>>) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "retry_calls_total",
                "Total invocations by final result (success, exhausted, aborted)"
            );
            describe_counter!("retry_attempts_total", "Total retries started");
            describe_histogram!("retry_attempts", "Attempts made per invocation");
        });

        Self { inner, config }
    }

    /// Returns a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, E> Clone for Retry<S, E>
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

impl<S, Req, E> Service<Req> for Retry<S, E>
where
    S: Service<Attempt<Req>, Error = E> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    Req: Clone + Send + 'static,
    E: Send + 'static,
{
    type Response = S::Response;
    type Error = RetryError<E>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(RetryError::NotReady)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let clone = self.inner.clone();
        let mut service = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);

        Box::pin(async move {
            let policy = &config.policy;
            let started = tokio::time::Instant::now();
            let mut state = RetryState::new(policy.max_retries);

            loop {
                let number = state.attempts_made();
                let attempt = Attempt::new(number, req.clone(), CancellationToken::new());
                let result = match service.ready().await {
                    Ok(ready) => ready.call(attempt).await,
                    Err(error) => Err(error),
                };

                let error = match result {
                    Ok(response) => {
                        let attempts = state.on_success();
                        config.event_listeners.emit(&RetryEvent::Success {
                            pattern_name: config.name.clone(),
                            timestamp: Instant::now(),
                            attempts,
                        });
                        record_finished(&config, "success", attempts);

                        #[cfg(feature = "tracing")]
                        debug!(retry = %config.name, attempts, "Invocation succeeded");

                        return Ok(response);
                    }
                    Err(error) => error,
                };

                let delay = policy.next_backoff(number - 1);
                let abort_reason = if !policy.should_retry(&error) {
                    Some(AbortReason::NotRetryable)
                } else if !policy.within_budget(started.elapsed(), delay) {
                    Some(AbortReason::MaxDurationExceeded)
                } else {
                    None
                };

                match state.on_failure(abort_reason.is_none()) {
                    FailureTransition::Retry(next) => {
                        state = next;
                        config.event_listeners.emit(&RetryEvent::Retry {
                            pattern_name: config.name.clone(),
                            timestamp: Instant::now(),
                            attempt: number,
                            delay,
                        });

                        #[cfg(feature = "metrics")]
                        counter!("retry_attempts_total", "retry" => config.name.clone())
                            .increment(1);

                        #[cfg(feature = "tracing")]
                        debug!(
                            retry = %config.name,
                            attempt = number,
                            delay_ms = delay.as_millis() as u64,
                            "Attempt failed, retrying"
                        );

                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    FailureTransition::Aborted { attempts } => {
                        let reason = abort_reason.unwrap_or(AbortReason::NotRetryable);
                        config.event_listeners.emit(&RetryEvent::Aborted {
                            pattern_name: config.name.clone(),
                            timestamp: Instant::now(),
                            attempts,
                            reason,
                        });
                        record_finished(&config, "aborted", attempts);

                        #[cfg(feature = "tracing")]
                        warn!(
                            retry = %config.name,
                            attempts,
                            reason = %reason,
                            "Retrying aborted"
                        );

                        return Err(RetryError::Aborted { attempts, error });
                    }
                    FailureTransition::Exhausted { attempts } => {
                        config.event_listeners.emit(&RetryEvent::Exhausted {
                            pattern_name: config.name.clone(),
                            timestamp: Instant::now(),
                            attempts,
                        });
                        record_finished(&config, "exhausted", attempts);

                        #[cfg(feature = "tracing")]
                        warn!(retry = %config.name, attempts, "Retries exhausted");

                        return Err(RetryError::Exhausted {
                            attempts,
                            last: error,
                        });
                    }
                }
            }
        })
    }
}

#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
fn record_finished<E>(config: &RetryConfig<E>, result: &'static str, attempts: usize) {
    #[cfg(feature = "metrics")]
    {
        counter!("retry_calls_total", "retry" => config.name.clone(), "result" => result)
            .increment(1);
        histogram!("retry_attempts", "retry" => config.name.clone()).record(attempts as f64);
    }
}
