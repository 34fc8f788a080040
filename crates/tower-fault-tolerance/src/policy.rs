//! Execution policies.

use crate::error::TerminalError;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_fault_tolerance_core::AttemptError;
use tower_fault_tolerance_fallback::{
    FallbackConfigBuilder, FallbackLayer, FallbackProvider, FallbackStrategy, SharedProvider,
};
use tower_fault_tolerance_retry::{FixedInterval, JitteredInterval, RetryConfig, RetryLayer};
use tower_fault_tolerance_timeout::{TimeoutConfig, TimeoutLayer};

/// Predicate over the failure of a single attempt.
pub type AttemptPredicate<E> = Arc<dyn Fn(&AttemptError<E>) -> bool + Send + Sync>;

/// Rejected policy settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The retry budget leaves no room for a single delay.
    #[error("max_duration ({max_duration:?}) must be greater than delay ({delay:?})")]
    MaxDurationNotAboveDelay {
        max_duration: Duration,
        delay: Duration,
    },

    /// A zero timeout would fail every attempt before it starts.
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

/// Retry, timeout and fallback settings for one kind of operation.
///
/// Built with [`Policy::builder`]; immutable afterwards. The layers it
/// describes are constructed once at build time and shared by every
/// execution.
pub struct Policy<Req, T, E> {
    name: String,
    max_retries: usize,
    timeout: Option<Duration>,
    delay: Duration,
    jitter: Duration,
    max_duration: Option<Duration>,
    cancel_running_attempt: bool,
    pub(crate) timeout_layer: TimeoutLayer,
    pub(crate) retry_layer: RetryLayer<AttemptError<E>>,
    pub(crate) fallback_layer: Option<FallbackLayer<Req, T, TerminalError<E>, E>>,
}

impl<Req, T, E> Policy<Req, T, E> {
    /// Creates a builder with default settings.
    pub fn builder() -> PolicyBuilder<Req, T, E> {
        PolicyBuilder::new()
    }

    /// The policy name used in events, logs and metrics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Retries allowed after the first attempt.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// The per-attempt deadline, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The base delay between attempts.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The maximum random deviation from `delay`.
    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    /// The overall retry budget, if any.
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration
    }

    /// Whether timed-out attempts are aborted as well as signaled.
    pub fn cancel_running_attempt(&self) -> bool {
        self.cancel_running_attempt
    }

    /// Returns true if a fallback is configured.
    pub fn has_fallback(&self) -> bool {
        self.fallback_layer.is_some()
    }
}

/// Builder for [`Policy`].
pub struct PolicyBuilder<Req, T, E> {
    name: String,
    max_retries: usize,
    timeout: Option<Duration>,
    delay: Duration,
    jitter: Duration,
    max_duration: Option<Duration>,
    cancel_running_attempt: bool,
    retry_on: Option<AttemptPredicate<E>>,
    abort_on: Option<AttemptPredicate<E>>,
    apply_on: Option<AttemptPredicate<E>>,
    skip_on: Option<AttemptPredicate<E>>,
    fallback: Option<SharedProvider<Req, T, TerminalError<E>, E>>,
    retry_hooks: Vec<Arc<dyn Fn(usize, Duration) + Send + Sync>>,
    timeout_hooks: Vec<Arc<dyn Fn(usize) + Send + Sync>>,
    fallback_hooks: Vec<Arc<dyn Fn(&'static str) + Send + Sync>>,
}

impl<Req, T, E> Default for PolicyBuilder<Req, T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, T, E> PolicyBuilder<Req, T, E> {
    /// Creates a builder with defaults.
    ///
    /// Defaults:
    /// - name: `"<unnamed>"`
    /// - max_retries: 3
    /// - timeout: none
    /// - delay and jitter: zero
    /// - max_duration: unbounded
    /// - cancel_running_attempt: true
    /// - no fallback
    pub fn new() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            max_retries: 3,
            timeout: None,
            delay: Duration::ZERO,
            jitter: Duration::ZERO,
            max_duration: None,
            cancel_running_attempt: true,
            retry_on: None,
            abort_on: None,
            apply_on: None,
            skip_on: None,
            fallback: None,
            retry_hooks: Vec::new(),
            timeout_hooks: Vec::new(),
            fallback_hooks: Vec::new(),
        }
    }

    /// Sets the name used in events, logs and metrics.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets how many times a failed attempt is retried.
    ///
    /// The first attempt does not count: `max_retries(1)` allows two attempts.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Bounds every attempt by `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Removes the per-attempt deadline.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Sets the pause between attempts.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Randomizes each pause uniformly within `delay ± jitter`, clamped at
    /// zero.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Stops retrying once `max_duration` has passed since the first attempt.
    pub fn max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = Some(max_duration);
        self
    }

    /// Sets whether a timed-out attempt is aborted in addition to having its
    /// cancellation token cancelled.
    pub fn cancel_running_attempt(mut self, cancel: bool) -> Self {
        self.cancel_running_attempt = cancel;
        self
    }

    /// Only retries failures matching `predicate`.
    pub fn retry_on<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&AttemptError<E>) -> bool + Send + Sync + 'static,
    {
        self.retry_on = Some(Arc::new(predicate));
        self
    }

    /// Never retries failures matching `predicate`.
    pub fn abort_on<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&AttemptError<E>) -> bool + Send + Sync + 'static,
    {
        self.abort_on = Some(Arc::new(predicate));
        self
    }

    /// Only applies the fallback when the last failure matches `predicate`.
    pub fn apply_on<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&AttemptError<E>) -> bool + Send + Sync + 'static,
    {
        self.apply_on = Some(Arc::new(predicate));
        self
    }

    /// Never applies the fallback when the last failure matches `predicate`.
    pub fn skip_on<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&AttemptError<E>) -> bool + Send + Sync + 'static,
    {
        self.skip_on = Some(Arc::new(predicate));
        self
    }

    /// Falls back to `provider` once retries are over.
    pub fn fallback_provider<P>(mut self, provider: P) -> Self
    where
        P: FallbackProvider<Req, TerminalError<E>, Response = T, Error = E> + 'static,
    {
        self.fallback = Some(Arc::new(provider));
        self
    }

    /// Registers a callback invoked with the failed attempt number and the
    /// delay before the next attempt.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.retry_hooks.push(Arc::new(f));
        self
    }

    /// Registers a callback invoked with the attempt number when an attempt
    /// times out.
    pub fn on_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.timeout_hooks.push(Arc::new(f));
        self
    }

    /// Registers a callback invoked with the provider kind when a fallback
    /// response is produced.
    pub fn on_fallback<F>(mut self, f: F) -> Self
    where
        F: Fn(&'static str) + Send + Sync + 'static,
    {
        self.fallback_hooks.push(Arc::new(f));
        self
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if let Some(max_duration) = self.max_duration {
            if max_duration <= self.delay {
                return Err(PolicyError::MaxDurationNotAboveDelay {
                    max_duration,
                    delay: self.delay,
                });
            }
        }
        if self.timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(PolicyError::ZeroTimeout);
        }
        Ok(())
    }
}

type Strategy<Req, T, E> = FallbackStrategy<Req, T, TerminalError<E>, E>;

impl<Req, T, E> PolicyBuilder<Req, T, E>
where
    Req: 'static,
    T: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    /// Falls back to a value computed from the original request.
    pub fn fallback<F>(self, f: F) -> Self
    where
        F: Fn(&Req) -> T + Send + Sync + 'static,
    {
        self.fallback_provider(Strategy::<Req, T, E>::FromRequest(Arc::new(f)))
    }

    /// Falls back to a fixed value.
    pub fn fallback_value(self, value: T) -> Self {
        self.fallback_provider(Strategy::<Req, T, E>::Value(value))
    }

    /// Falls back to a value computed from the request and the terminal
    /// failure.
    pub fn fallback_with_error<F>(self, f: F) -> Self
    where
        F: Fn(&Req, &TerminalError<E>) -> T + Send + Sync + 'static,
    {
        self.fallback_provider(Strategy::<Req, T, E>::FromRequestError(Arc::new(f)))
    }

    /// Falls back to a backup operation. Its error is returned as
    /// [`ExecuteError::FallbackFailed`](crate::ExecuteError::FallbackFailed).
    pub fn fallback_service<F, Fut>(self, backup: F) -> Self
    where
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let backup = move |req: Req| -> BoxFuture<'static, Result<T, E>> { Box::pin(backup(req)) };
        self.fallback_provider(Strategy::<Req, T, E>::Service(Arc::new(backup)))
    }
}

impl<Req, T, E> PolicyBuilder<Req, T, E>
where
    Req: 'static,
    T: 'static,
    E: 'static,
{
    /// Validates the settings and builds the policy.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] if `max_duration` does not exceed `delay`, or
    /// if `timeout` is zero.
    pub fn build(self) -> Result<Policy<Req, T, E>, PolicyError> {
        self.validate()?;

        let mut timeout = TimeoutConfig::builder()
            .timeout(self.timeout)
            .cancel_running_attempt(self.cancel_running_attempt)
            .name(self.name.clone());
        for hook in self.timeout_hooks {
            timeout = timeout.on_timeout(move |attempt| hook(attempt));
        }

        let mut retry = RetryConfig::<AttemptError<E>>::builder()
            .name(self.name.clone())
            .max_retries(self.max_retries);
        retry = if self.jitter.is_zero() {
            retry.backoff(FixedInterval::new(self.delay))
        } else {
            retry.backoff(JitteredInterval::fixed(self.delay, self.jitter))
        };
        if let Some(max_duration) = self.max_duration {
            retry = retry.max_duration(max_duration);
        }
        if let Some(predicate) = self.retry_on {
            retry = retry.retry_on(move |error| predicate(error));
        }
        if let Some(predicate) = self.abort_on {
            retry = retry.abort_on(move |error| predicate(error));
        }
        for hook in self.retry_hooks {
            retry = retry.on_retry(move |attempt, delay| hook(attempt, delay));
        }

        let fallback_layer = match self.fallback {
            Some(provider) => {
                let apply_on = self.apply_on;
                let skip_on = self.skip_on;
                let mut fallback = FallbackConfigBuilder::new()
                    .name(self.name.clone())
                    .provider(provider)
                    .handle(move |terminal: &TerminalError<E>| {
                        let last = terminal.last_error();
                        let applies = match &apply_on {
                            Some(predicate) => predicate(last),
                            None => true,
                        };
                        let skipped = skip_on.as_ref().is_some_and(|predicate| predicate(last));
                        applies && !skipped
                    });
                for hook in self.fallback_hooks {
                    fallback = fallback.on_applied(move |kind| hook(kind));
                }
                Some(fallback.build())
            }
            None => None,
        };

        Ok(Policy {
            name: self.name,
            max_retries: self.max_retries,
            timeout: self.timeout,
            delay: self.delay,
            jitter: self.jitter,
            max_duration: self.max_duration,
            cancel_running_attempt: self.cancel_running_attempt,
            timeout_layer: timeout.build(),
            retry_layer: retry.build(),
            fallback_layer,
        })
    }
}
