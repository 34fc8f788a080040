//! Error types for the fallback service.

use std::fmt;

/// Error type for the fallback service.
///
/// `E` is the wrapped service's error; `F` is the fallback provider's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackError<E, F> {
    /// The inner service failed and no fallback was applied, either because
    /// none is configured or because the error was not handled.
    Inner(E),

    /// The fallback provider itself failed.
    FallbackFailed(F),
}

impl<E, F> FallbackError<E, F> {
    /// Returns `true` if this is an inner service error.
    pub fn is_inner(&self) -> bool {
        matches!(self, Self::Inner(_))
    }

    /// Returns `true` if the fallback itself failed.
    pub fn is_fallback_failed(&self) -> bool {
        matches!(self, Self::FallbackFailed(_))
    }

    /// Returns the inner service error, if that is what this is.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::FallbackFailed(_) => None,
        }
    }

    /// Maps the inner service error.
    pub fn map_inner<U>(self, f: impl FnOnce(E) -> U) -> FallbackError<U, F> {
        match self {
            Self::Inner(e) => FallbackError::Inner(f(e)),
            Self::FallbackFailed(e) => FallbackError::FallbackFailed(e),
        }
    }
}

impl<E> FallbackError<E, E> {
    /// Collapses either variant into the underlying error.
    pub fn into_any(self) -> E {
        match self {
            Self::Inner(e) | Self::FallbackFailed(e) => e,
        }
    }
}

impl<E: fmt::Display, F: fmt::Display> fmt::Display for FallbackError<E, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner(e) => write!(f, "inner service error: {}", e),
            Self::FallbackFailed(e) => write!(f, "fallback failed: {}", e),
        }
    }
}

impl<E, F> std::error::Error for FallbackError<E, F>
where
    E: std::error::Error + 'static,
    F: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
            Self::FallbackFailed(e) => Some(e),
        }
    }
}
