//! Policy-driven fault tolerance for async operations.
//!
//! An [`Executor`] runs an operation under a [`Policy`] that combines three
//! strategies, each provided by its own crate:
//!
//! - a per-attempt deadline ([`tower_fault_tolerance_timeout`])
//! - bounded retry with optional delay, jitter and time budget
//!   ([`tower_fault_tolerance_retry`])
//! - a fallback applied once retries are over
//!   ([`tower_fault_tolerance_fallback`])
//!
//! They compose in a fixed order. The deadline bounds each attempt, retry
//! repeats bounded attempts, and the fallback only ever sees the terminal
//! failure of the whole sequence:
//!
//! ```text
//! Fallback(Retry(Timeout(Counting(operation))))
//! ```
//!
//! Every attempt is counted in a caller-owned [`InvocationCounter`] the
//! moment it starts.
//!
//! # Examples
//!
//! ```
//! use tower_fault_tolerance::{operation_fn, Executor, InvocationCounter, Policy};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let policy = Policy::<&'static str, String, String>::builder()
//!     .name("serviceA")
//!     .max_retries(1)
//!     .timeout(Duration::from_millis(500))
//!     .fallback(|service| format!("fallback for {}", service))
//!     .build()
//!     .unwrap();
//! let executor = Executor::new(policy);
//!
//! let counter = InvocationCounter::new();
//! let operation = operation_fn(|_attempt| async { Err::<String, _>("Connection failed".to_string()) });
//!
//! let result = executor.execute(operation, "serviceA", &counter).await;
//! assert_eq!(result, Ok("fallback for serviceA".to_string()));
//! assert_eq!(counter.get(), 2);
//! # }
//! ```
//!
//! ## Cancellation
//!
//! Each attempt carries a [`CancellationToken`] that is cancelled when the
//! attempt's deadline passes. Operations that do long work can watch it:
//!
//! ```
//! use tower_fault_tolerance::{operation_fn, Attempt};
//! use std::time::Duration;
//!
//! let operation = operation_fn(|attempt: Attempt<u32>| async move {
//!     let token = attempt.cancellation().clone();
//!     tokio::select! {
//!         _ = token.cancelled() => Err("cancelled"),
//!         _ = tokio::time::sleep(Duration::from_secs(2)) => Ok(attempt.request),
//!     }
//! });
//! # let _ = operation;
//! ```

mod counting;
mod error;
mod operation;
mod policy;

pub use counting::{Counting, CountingLayer};
pub use error::{ExecuteError, TerminalError};
pub use operation::operation_fn;
pub use policy::{AttemptPredicate, Policy, PolicyBuilder, PolicyError};

pub use tower_fault_tolerance_core::{
    Attempt, AttemptError, CancellationToken, EventListener, EventListeners, FaultToleranceEvent,
    FnListener, InvocationCounter, Outcome, OutcomeKind,
};
pub use tower_fault_tolerance_fallback::{FallbackError, FallbackProvider, FallbackStrategy};
pub use tower_fault_tolerance_retry::{AbortReason, RetryError};

use std::sync::Arc;
use tower::{Layer, Service, ServiceBuilder, ServiceExt};

/// Runs `operation` once under `policy`.
///
/// Each attempt receives a clone of `request`. Attempts are counted in
/// `counter` as they start. The result is the operation's value, the
/// fallback's value, or the terminal failure.
///
/// # Errors
///
/// - [`ExecuteError::ExhaustedRetries`] when every permitted attempt failed
///   and no fallback handled it
/// - [`ExecuteError::Aborted`] when retrying stopped early and no fallback
///   handled it
/// - [`ExecuteError::FallbackFailed`] when the fallback itself failed
pub async fn execute<Op, Req, T, E>(
    policy: &Policy<Req, T, E>,
    counter: &InvocationCounter,
    operation: Op,
    request: Req,
) -> Result<T, ExecuteError<E>>
where
    Op: Service<Attempt<Req>, Response = T, Error = E> + Clone + Send + 'static,
    Op::Future: Send + 'static,
    Req: Clone + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    #[cfg(feature = "tracing")]
    tracing::debug!(policy = %policy.name(), max_retries = policy.max_retries(), "Executing operation");

    let attempts = ServiceBuilder::new()
        .layer(policy.retry_layer.clone())
        .layer(policy.timeout_layer.clone())
        .layer(CountingLayer::new(counter.clone()))
        .service(operation);

    let result = match &policy.fallback_layer {
        Some(fallback) => fallback
            .layer(attempts)
            .oneshot(request)
            .await
            .map_err(ExecuteError::from),
        None => attempts.oneshot(request).await.map_err(ExecuteError::from),
    };

    #[cfg(feature = "tracing")]
    match &result {
        Ok(_) => tracing::debug!(policy = %policy.name(), "Execution succeeded"),
        Err(error) => tracing::debug!(
            policy = %policy.name(),
            attempts = ?error.attempts(),
            timeout = error.is_timeout(),
            "Execution failed"
        ),
    }

    result
}

/// Runs operations under a shared [`Policy`].
///
/// Cloning an executor is cheap; clones share the policy.
pub struct Executor<Req, T, E> {
    policy: Arc<Policy<Req, T, E>>,
}

impl<Req, T, E> Executor<Req, T, E> {
    /// Creates an executor for `policy`.
    pub fn new(policy: Policy<Req, T, E>) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    /// Creates an executor from an already shared policy.
    pub fn from_shared(policy: Arc<Policy<Req, T, E>>) -> Self {
        Self { policy }
    }

    /// The policy applied to every execution.
    pub fn policy(&self) -> &Policy<Req, T, E> {
        &self.policy
    }

    /// Runs `operation` under this executor's policy.
    ///
    /// See [`execute`].
    pub async fn execute<Op>(
        &self,
        operation: Op,
        request: Req,
        counter: &InvocationCounter,
    ) -> Result<T, ExecuteError<E>>
    where
        Op: Service<Attempt<Req>, Response = T, Error = E> + Clone + Send + 'static,
        Op::Future: Send + 'static,
        Req: Clone + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        execute(&self.policy, counter, operation, request).await
    }
}

impl<Req, T, E> Clone for Executor<Req, T, E> {
    fn clone(&self) -> Self {
        Self {
            policy: Arc::clone(&self.policy),
        }
    }
}

impl<Req, T, E> From<Policy<Req, T, E>> for Executor<Req, T, E> {
    fn from(policy: Policy<Req, T, E>) -> Self {
        Self::new(policy)
    }
}
