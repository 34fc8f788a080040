use std::fmt;
use tower_fault_tolerance_core::AttemptError;
use tower_fault_tolerance_fallback::FallbackError;
use tower_fault_tolerance_retry::RetryError;

/// The terminal failure of a retry sequence, as seen by a fallback.
pub type TerminalError<E> = RetryError<AttemptError<E>>;

/// The final error of an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteError<E> {
    /// Every permitted attempt failed and no fallback handled it. `last` is
    /// the final attempt's failure.
    ExhaustedRetries { attempts: usize, last: AttemptError<E> },

    /// Retrying stopped early (the failure was excluded from retry or the
    /// time budget ran out) and no fallback handled it.
    Aborted { attempts: usize, cause: AttemptError<E> },

    /// The operation failed to become ready, so no attempt was started.
    NotReady(AttemptError<E>),

    /// The fallback was called and failed.
    FallbackFailed(E),
}

impl<E> ExecuteError<E> {
    /// Number of attempts made, if the error came from the operation.
    pub fn attempts(&self) -> Option<usize> {
        match self {
            Self::ExhaustedRetries { attempts, .. } | Self::Aborted { attempts, .. } => {
                Some(*attempts)
            }
            Self::NotReady(_) => Some(0),
            Self::FallbackFailed(_) => None,
        }
    }

    /// The last attempt's failure, if the error came from the operation.
    pub fn last_attempt_error(&self) -> Option<&AttemptError<E>> {
        match self {
            Self::ExhaustedRetries { last, .. } => Some(last),
            Self::Aborted { cause, .. } | Self::NotReady(cause) => Some(cause),
            Self::FallbackFailed(_) => None,
        }
    }

    /// Returns true if the last attempt timed out.
    pub fn is_timeout(&self) -> bool {
        self.last_attempt_error()
            .is_some_and(|error| error.is_timeout())
    }

    /// Returns true if all attempts were used.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::ExhaustedRetries { .. })
    }
}

impl<E> From<TerminalError<E>> for ExecuteError<E> {
    fn from(error: TerminalError<E>) -> Self {
        match error {
            RetryError::Exhausted { attempts, last } => Self::ExhaustedRetries { attempts, last },
            RetryError::Aborted { attempts, error } => Self::Aborted {
                attempts,
                cause: error,
            },
            RetryError::NotReady(error) => Self::NotReady(error),
        }
    }
}

impl<E> From<FallbackError<TerminalError<E>, E>> for ExecuteError<E> {
    fn from(error: FallbackError<TerminalError<E>, E>) -> Self {
        match error {
            FallbackError::Inner(terminal) => terminal.into(),
            FallbackError::FallbackFailed(error) => Self::FallbackFailed(error),
        }
    }
}

impl<E: fmt::Display> fmt::Display for ExecuteError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExhaustedRetries { attempts, last } => {
                write!(f, "retries exhausted after {} attempts: {}", attempts, last)
            }
            Self::Aborted { attempts, cause } => {
                write!(f, "aborted after {} attempts: {}", attempts, cause)
            }
            Self::NotReady(cause) => write!(f, "operation not ready: {}", cause),
            Self::FallbackFailed(e) => write!(f, "fallback failed: {}", e),
        }
    }
}

impl<E> std::error::Error for ExecuteError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ExhaustedRetries { last, .. } => Some(last),
            Self::Aborted { cause, .. } | Self::NotReady(cause) => Some(cause),
            Self::FallbackFailed(e) => Some(e),
        }
    }
}
