//! The retry state machine.
//!
//! ```text
//!                 failure, retries left, retryable
//!               +-------------------------------+
//!               v                               |
//! start --> ATTEMPTING --success--> SUCCEEDED   |
//!               |                               |
//!               +---failure---------------------+
//!               |
//!               +--failure, no retries left--> EXHAUSTED
//!               +--failure, not retryable----> ABORTED
//! ```
//!
//! A [`RetryState`] only ever represents `ATTEMPTING`. Recording an outcome
//! consumes it, so a settled sequence cannot be driven any further.
//! `EXHAUSTED` and `ABORTED` are both terminal failures; they differ only in
//! why no further attempt is made.

/// Tracks attempts for one invocation while an attempt is in flight.
///
/// Starts with one attempt made. A failure while
/// `attempts_made <= max_retries` starts another attempt; once
/// `attempts_made > max_retries` the next failure is terminal. The number of
/// attempts therefore stays within `1..=max_retries + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    max_retries: usize,
    attempts_made: usize,
}

/// The result of recording a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureTransition {
    /// Another attempt is permitted; the state has advanced to it.
    Retry(RetryState),
    /// The last permitted attempt failed.
    Exhausted {
        /// Attempts made in total.
        attempts: usize,
    },
    /// The failure was not eligible for retry.
    Aborted {
        /// Attempts made in total.
        attempts: usize,
    },
}

impl FailureTransition {
    /// Returns true if no further attempt will be made.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FailureTransition::Retry(_))
    }

    /// Attempts made so far, counting the next one when retrying.
    pub fn attempts(&self) -> usize {
        match self {
            FailureTransition::Retry(state) => state.attempts_made(),
            FailureTransition::Exhausted { attempts } | FailureTransition::Aborted { attempts } => {
                *attempts
            }
        }
    }
}

impl RetryState {
    /// Creates the state for a fresh invocation.
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            attempts_made: 1,
        }
    }

    /// Number of attempts started so far, including the current one.
    pub fn attempts_made(&self) -> usize {
        self.attempts_made
    }

    /// The configured retry limit.
    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Returns true if another attempt would be permitted after a failure.
    pub fn has_retries_left(&self) -> bool {
        self.attempts_made <= self.max_retries
    }

    /// Records a successful attempt and returns the number of attempts made.
    pub fn on_success(self) -> usize {
        self.attempts_made
    }

    /// Records a failed attempt.
    ///
    /// `retryable` is ignored when no retries are left; running out of
    /// attempts always reports [`FailureTransition::Exhausted`].
    pub fn on_failure(self, retryable: bool) -> FailureTransition {
        if !self.has_retries_left() {
            FailureTransition::Exhausted {
                attempts: self.attempts_made,
            }
        } else if !retryable {
            FailureTransition::Aborted {
                attempts: self.attempts_made,
            }
        } else {
            FailureTransition::Retry(Self {
                attempts_made: self.attempts_made + 1,
                ..self
            })
        }
    }
}
