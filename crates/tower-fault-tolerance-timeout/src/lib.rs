//! Per-attempt timeout supervision for Tower services.
//!
//! Bounds each [`Attempt`] by a deadline:
//! - The attempt runs on its own Tokio task and is raced against a timer;
//!   whichever finishes first decides the outcome
//! - On timeout the attempt's cancellation token is cancelled, so operations
//!   that watch it can stop early
//! - With `cancel_running_attempt(true)` (the default) the task is also
//!   aborted; otherwise it keeps running and its result is discarded
//! - Without a deadline, attempts run to completion unsupervised
//! - If the caller drops the call while an attempt is running, the token is
//!   cancelled and, with `cancel_running_attempt(true)`, the task is aborted
//!
//! Deadlines are measured on Tokio's monotonic clock.
//!
//! ## Layer Example
//!
//! ```rust
//! use tower_fault_tolerance_core::Attempt;
//! use tower_fault_tolerance_timeout::TimeoutLayer;
//! use tower::{Layer, Service, ServiceExt, service_fn};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let layer = TimeoutLayer::builder()
//!     .timeout_duration(Duration::from_millis(500))
//!     .on_timeout(|attempt| eprintln!("attempt {} timed out", attempt))
//!     .build();
//!
//! let svc = service_fn(|attempt: Attempt<u64>| async move {
//!     tokio::time::sleep(Duration::from_millis(attempt.request)).await;
//!     Ok::<_, std::io::Error>("done")
//! });
//!
//! let mut service = layer.layer(svc);
//! let result = service.ready().await.unwrap().call(Attempt::first(1_000)).await;
//! assert!(result.unwrap_err().is_timeout());
//! # }
//! ```
//!
//! ## Standalone
//!
//! [`run_with_timeout`] supervises a single future without a service:
//!
//! ```rust
//! use tower_fault_tolerance_core::{CancellationToken, Outcome};
//! use tower_fault_tolerance_timeout::run_with_timeout;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let token = CancellationToken::new();
//! let outcome: Outcome<u32, ()> =
//!     run_with_timeout(async { Ok(7) }, Some(Duration::from_millis(50)), &token).await;
//! assert_eq!(outcome, Outcome::Success(7));
//! # }
//! ```

use futures::future::{BoxFuture, Either};
use std::future::Future;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tower::Service;
use tower_fault_tolerance_core::{Attempt, Outcome};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_histogram, histogram};

#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

pub use config::{TimeoutConfig, TimeoutConfigBuilder};
pub use events::TimeoutEvent;
pub use layer::TimeoutLayer;
pub use tower_fault_tolerance_core::AttemptError;

mod config;
mod events;
mod layer;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// A Tower service that bounds each attempt of an inner service by a deadline.
#[derive(Clone)]
pub struct Timeout<S> {
    inner: S,
    config: Arc<TimeoutConfig>,
}

impl<S> Timeout<S> {
    /// Creates a new timeout supervisor wrapping the given service.
    pub(crate) fn new(inner: S, config: Arc<TimeoutConfig>) -> Self {
        #[cfg(feature = "metrics")]
        METRICS_INIT.call_once(|| {
            describe_counter!(
                "timeout_calls_total",
                "Total number of supervised attempts (success, error, or timeout)"
            );
            describe_histogram!(
                "timeout_call_duration_seconds",
                "Duration of attempts that finished before their deadline"
            );
        });

        Self { inner, config }
    }

    /// Returns a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S, Req> Service<Attempt<Req>> for Timeout<S>
where
    S: Service<Attempt<Req>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = AttemptError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(AttemptError::Operation)
    }

    fn call(&mut self, attempt: Attempt<Req>) -> Self::Future {
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);

        let number = attempt.number;
        let cancellation = attempt.cancellation().clone();
        // The attempt starts here, before its deadline is evaluated.
        let future = inner.call(attempt);

        Box::pin(async move {
            let Some(deadline) = config.timeout_duration else {
                return future.await.map_err(AttemptError::Operation);
            };

            let start = tokio::time::Instant::now();
            let result = supervise(
                future,
                deadline,
                cancellation,
                config.cancel_running_attempt,
            )
            .await;
            record(&config, number, deadline, start.elapsed(), &result);
            result
        })
    }
}

/// Runs `operation` bounded by `timeout`, classifying the result.
///
/// The operation is spawned onto its own task and raced against the
/// deadline. If the deadline wins, `cancellation` is cancelled, the task is
/// aborted, and the outcome is [`Outcome::Timeout`] without waiting for the
/// operation to finish. With `timeout` set to `None`, the operation is awaited
/// directly.
///
/// # Panics
///
/// A panic inside the operation is resumed on the caller.
pub async fn run_with_timeout<F, T, E>(
    operation: F,
    timeout: Option<Duration>,
    cancellation: &CancellationToken,
) -> Outcome<T, E>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    match timeout {
        Some(deadline) => supervise(operation, deadline, cancellation.clone(), true)
            .await
            .into(),
        None => operation.await.map_err(AttemptError::Operation).into(),
    }
}

async fn supervise<F, T, E>(
    operation: F,
    deadline: Duration,
    cancellation: CancellationToken,
    abort_on_timeout: bool,
) -> Result<T, AttemptError<E>>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    let handle = tokio::spawn(operation);
    let mut task = if abort_on_timeout {
        Either::Left(AbortOnDropHandle::new(handle))
    } else {
        Either::Right(handle)
    };
    // Fires if the caller stops waiting before the attempt settles.
    let cancel_on_drop = cancellation.drop_guard();

    match tokio::time::timeout(deadline, &mut task).await {
        Ok(Ok(result)) => {
            cancel_on_drop.disarm();
            result.map_err(AttemptError::Operation)
        }
        Ok(Err(join_error)) => match join_error.try_into_panic() {
            Ok(payload) => {
                cancel_on_drop.disarm();
                std::panic::resume_unwind(payload)
            }
            // Only a runtime shutdown cancels the task before the deadline;
            // the attempt never produced a value.
            Err(_) => {
                cancel_on_drop.disarm().cancel();
                Err(AttemptError::Timeout { after: deadline })
            }
        },
        Err(_elapsed) => {
            cancel_on_drop.disarm().cancel();
            // Dropping an attached task aborts it.
            drop(task);
            Err(AttemptError::Timeout { after: deadline })
        }
    }
}

fn record<T, E>(
    config: &TimeoutConfig,
    attempt: usize,
    deadline: Duration,
    elapsed: Duration,
    result: &Result<T, AttemptError<E>>,
) {
    match result {
        Ok(_) => {
            config.event_listeners.emit(&TimeoutEvent::Success {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                attempt,
                duration: elapsed,
            });

            #[cfg(feature = "metrics")]
            {
                counter!("timeout_calls_total", "timeout" => config.name.clone(), "result" => "success").increment(1);
                histogram!("timeout_call_duration_seconds", "timeout" => config.name.clone())
                    .record(elapsed.as_secs_f64());
            }

            #[cfg(feature = "tracing")]
            debug!(
                timeout = %config.name,
                attempt,
                duration_ms = elapsed.as_millis() as u64,
                "Attempt succeeded within deadline"
            );
        }
        Err(AttemptError::Operation(_)) => {
            config.event_listeners.emit(&TimeoutEvent::Error {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                attempt,
                duration: elapsed,
            });

            #[cfg(feature = "metrics")]
            {
                counter!("timeout_calls_total", "timeout" => config.name.clone(), "result" => "error").increment(1);
                histogram!("timeout_call_duration_seconds", "timeout" => config.name.clone())
                    .record(elapsed.as_secs_f64());
            }

            #[cfg(feature = "tracing")]
            debug!(
                timeout = %config.name,
                attempt,
                duration_ms = elapsed.as_millis() as u64,
                "Attempt failed within deadline"
            );
        }
        Err(AttemptError::Timeout { .. }) => {
            config.event_listeners.emit(&TimeoutEvent::Timeout {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                attempt,
                timeout_duration: deadline,
            });

            #[cfg(feature = "metrics")]
            counter!("timeout_calls_total", "timeout" => config.name.clone(), "result" => "timeout").increment(1);

            #[cfg(feature = "tracing")]
            warn!(
                timeout = %config.name,
                attempt,
                timeout_ms = deadline.as_millis() as u64,
                "Attempt timed out"
            );
        }
    }
}
