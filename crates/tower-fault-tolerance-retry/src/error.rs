use std::fmt;

/// The failure returned once retrying stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E> {
    /// Every permitted attempt failed; `last` is the final attempt's error.
    Exhausted { attempts: usize, last: E },
    /// A failure was not retried, either because the error is excluded by
    /// the policy or because the time budget ran out.
    Aborted { attempts: usize, error: E },
    /// The inner service failed to become ready, so no attempt was started.
    NotReady(E),
}

impl<E> RetryError<E> {
    /// Number of attempts that ran. Zero for [`RetryError::NotReady`].
    pub fn attempts(&self) -> usize {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Aborted { attempts, .. } => {
                *attempts
            }
            RetryError::NotReady(_) => 0,
        }
    }

    /// Returns true if all attempts were used.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// The error of the last attempt, or the readiness error.
    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Aborted { error, .. } | RetryError::NotReady(error) => error,
        }
    }

    /// Consumes this error, returning the last attempt's error.
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Aborted { error, .. } | RetryError::NotReady(error) => error,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { attempts, last } => {
                write!(f, "retries exhausted after {} attempts: {}", attempts, last)
            }
            RetryError::Aborted { attempts, error } => {
                write!(f, "retry aborted after {} attempts: {}", attempts, error)
            }
            RetryError::NotReady(error) => write!(f, "service not ready: {}", error),
        }
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.last_error())
    }
}
