//! Attempts and their outcomes.
//!
//! An [`Attempt`] is what an operation receives each time the retry loop
//! starts it. The attempt carries the original request, its 1-based number
//! within the current invocation, and a [`CancellationToken`] that is
//! cancelled when the attempt is abandoned (for example after a timeout).
//!
//! Cancellation is cooperative. An operation that wants to stop early polls
//! [`Attempt::is_cancelled`] or awaits [`Attempt::cancelled`]:
//!
//! ```rust
//! use tower_fault_tolerance_core::Attempt;
//! use std::time::Duration;
//!
//! async fn slow_lookup(attempt: Attempt<u64>) -> Result<String, std::io::Error> {
//!     tokio::select! {
//!         _ = tokio::time::sleep(Duration::from_millis(attempt.request)) => {
//!             Ok("done".to_string())
//!         }
//!         _ = attempt.cancelled() => {
//!             Err(std::io::Error::other("interrupted"))
//!         }
//!     }
//! }
//! ```

use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One execution of an operation within a retry sequence.
#[derive(Debug, Clone)]
pub struct Attempt<Req> {
    /// Attempt number, starting at 1 for the first call.
    pub number: usize,
    /// The request, cloned from the original arguments for every attempt.
    pub request: Req,
    cancellation: CancellationToken,
}

impl<Req> Attempt<Req> {
    /// Creates the first attempt for a request.
    pub fn first(request: Req) -> Self {
        Self::new(1, request, CancellationToken::new())
    }

    /// Creates an attempt with an explicit number and cancellation token.
    pub fn new(number: usize, request: Req, cancellation: CancellationToken) -> Self {
        Self {
            number,
            request,
            cancellation,
        }
    }

    /// Returns true if this attempt is the first one.
    pub fn is_first(&self) -> bool {
        self.number == 1
    }

    /// Returns the token signaled when this attempt is abandoned.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns true once the attempt has been abandoned.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Completes when the attempt has been abandoned.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await
    }

    /// Consumes the attempt, returning the request.
    pub fn into_request(self) -> Req {
        self.request
    }

    /// Maps the request while keeping number and cancellation.
    pub fn map<F, U>(self, f: F) -> Attempt<U>
    where
        F: FnOnce(Req) -> U,
    {
        Attempt {
            number: self.number,
            request: f(self.request),
            cancellation: self.cancellation,
        }
    }
}

/// Why a single attempt did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptError<E> {
    /// The attempt did not complete within its deadline.
    Timeout {
        /// The deadline that was exceeded.
        after: Duration,
    },
    /// The operation itself failed.
    Operation(E),
}

impl<E> AttemptError<E> {
    /// Returns `true` if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AttemptError::Timeout { .. })
    }

    /// Returns `true` if the operation itself failed.
    pub fn is_operation(&self) -> bool {
        matches!(self, AttemptError::Operation(_))
    }

    /// Returns a reference to the operation error, if any.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            AttemptError::Operation(e) => Some(e),
            AttemptError::Timeout { .. } => None,
        }
    }

    /// Converts into the operation error, if any.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            AttemptError::Operation(e) => Some(e),
            AttemptError::Timeout { .. } => None,
        }
    }

    /// Maps the operation error.
    pub fn map<F, U>(self, f: F) -> AttemptError<U>
    where
        F: FnOnce(E) -> U,
    {
        match self {
            AttemptError::Timeout { after } => AttemptError::Timeout { after },
            AttemptError::Operation(e) => AttemptError::Operation(f(e)),
        }
    }

    /// Returns the outcome kind this failure is classified as.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            AttemptError::Timeout { .. } => OutcomeKind::Timeout,
            AttemptError::Operation(_) => OutcomeKind::Exception,
        }
    }
}

impl<E: fmt::Display> fmt::Display for AttemptError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::Timeout { after } => write!(f, "attempt timed out after {:?}", after),
            AttemptError::Operation(e) => write!(f, "operation failed: {}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for AttemptError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AttemptError::Timeout { .. } => None,
            AttemptError::Operation(e) => Some(e),
        }
    }
}

/// Classification of how an attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// The operation produced a value.
    Success,
    /// The operation failed with an error.
    Exception,
    /// The deadline elapsed first.
    Timeout,
}

impl OutcomeKind {
    /// Label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::Exception => "exception",
            OutcomeKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classified result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The operation produced a value.
    Success(T),
    /// The operation failed.
    Exception(E),
    /// The attempt was abandoned at its deadline.
    Timeout {
        /// The deadline that was exceeded.
        after: Duration,
    },
}

impl<T, E> Outcome<T, E> {
    /// Returns the classification of this outcome.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success(_) => OutcomeKind::Success,
            Outcome::Exception(_) => OutcomeKind::Exception,
            Outcome::Timeout { .. } => OutcomeKind::Timeout,
        }
    }

    /// Returns `true` for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Converts into a `Result`, mapping failures to [`AttemptError`].
    pub fn into_result(self) -> Result<T, AttemptError<E>> {
        match self {
            Outcome::Success(v) => Ok(v),
            Outcome::Exception(e) => Err(AttemptError::Operation(e)),
            Outcome::Timeout { after } => Err(AttemptError::Timeout { after }),
        }
    }
}

impl<T, E> From<Result<T, AttemptError<E>>> for Outcome<T, E> {
    fn from(result: Result<T, AttemptError<E>>) -> Self {
        match result {
            Ok(v) => Outcome::Success(v),
            Err(AttemptError::Operation(e)) => Outcome::Exception(e),
            Err(AttemptError::Timeout { after }) => Outcome::Timeout { after },
        }
    }
}

impl<T, E> From<Outcome<T, E>> for Result<T, AttemptError<E>> {
    fn from(outcome: Outcome<T, E>) -> Self {
        outcome.into_result()
    }
}
