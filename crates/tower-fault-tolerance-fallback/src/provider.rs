//! Fallback producers and the dispatch contract.

use crate::FallbackError;
use futures::future::{self, BoxFuture};
use std::sync::Arc;

/// Produces a substitute response once an operation has failed for good.
///
/// The provider receives the same request the operation received and the
/// terminal error. It is called at most once per invocation and is neither
/// retried nor time-bounded.
pub trait FallbackProvider<Req, E>: Send + Sync {
    /// The substitute response type.
    type Response;
    /// The error returned when the provider itself fails.
    type Error;

    /// Produces the fallback response for `request`.
    fn produce(
        &self,
        request: Req,
        error: &E,
    ) -> BoxFuture<'static, Result<Self::Response, Self::Error>>;

    /// Short label used in events and metrics.
    fn kind(&self) -> &'static str {
        "custom"
    }
}

impl<Req, E, P> FallbackProvider<Req, E> for Arc<P>
where
    P: FallbackProvider<Req, E> + ?Sized,
{
    type Response = P::Response;
    type Error = P::Error;

    fn produce(
        &self,
        request: Req,
        error: &E,
    ) -> BoxFuture<'static, Result<Self::Response, Self::Error>> {
        (**self).produce(request, error)
    }

    fn kind(&self) -> &'static str {
        (**self).kind()
    }
}

/// Calls a fallback provider with the original request.
///
/// Without a provider, the terminal error is returned as
/// [`FallbackError::Inner`]. A provider failure is returned as
/// [`FallbackError::FallbackFailed`].
pub async fn dispatch<Req, E, P>(
    terminal: E,
    provider: Option<&P>,
    request: Req,
) -> Result<P::Response, FallbackError<E, P::Error>>
where
    P: FallbackProvider<Req, E> + ?Sized,
{
    match provider {
        Some(provider) => provider
            .produce(request, &terminal)
            .await
            .map_err(FallbackError::FallbackFailed),
        None => Err(FallbackError::Inner(terminal)),
    }
}

/// Computes a response from nothing.
pub type ValueFn<Res> = Arc<dyn Fn() -> Res + Send + Sync>;

/// Computes a response from the original request.
pub type FromRequestFn<Req, Res> = Arc<dyn Fn(&Req) -> Res + Send + Sync>;

/// Computes a response from the original request and the terminal error.
pub type FromRequestErrorFn<Req, Res, E> = Arc<dyn Fn(&Req, &E) -> Res + Send + Sync>;

/// Calls a backup operation asynchronously.
pub type ServiceFn<Req, Res, F> =
    Arc<dyn Fn(Req) -> BoxFuture<'static, Result<Res, F>> + Send + Sync>;

/// The built-in fallback producers.
pub enum FallbackStrategy<Req, Res, E, F> {
    /// Return a fixed value (cloned for each fallback).
    Value(Res),

    /// Build a fresh value for each fallback.
    ValueFn(ValueFn<Res>),

    /// Compute a response from the request.
    FromRequest(FromRequestFn<Req, Res>),

    /// Compute a response from the request and the error.
    FromRequestError(FromRequestErrorFn<Req, Res, E>),

    /// Call a backup operation, which may itself fail.
    Service(ServiceFn<Req, Res, F>),
}

impl<Req, Res, E, F> Clone for FallbackStrategy<Req, Res, E, F>
where
    Res: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Self::Value(v) => Self::Value(v.clone()),
            Self::ValueFn(f) => Self::ValueFn(Arc::clone(f)),
            Self::FromRequest(f) => Self::FromRequest(Arc::clone(f)),
            Self::FromRequestError(f) => Self::FromRequestError(Arc::clone(f)),
            Self::Service(s) => Self::Service(Arc::clone(s)),
        }
    }
}

impl<Req, Res, E, F> FallbackProvider<Req, E> for FallbackStrategy<Req, Res, E, F>
where
    Res: Clone + Send + Sync + 'static,
    F: Send + 'static,
{
    type Response = Res;
    type Error = F;

    fn produce(&self, request: Req, error: &E) -> BoxFuture<'static, Result<Res, F>> {
        match self {
            Self::Value(value) => Box::pin(future::ready(Ok(value.clone()))),
            Self::ValueFn(f) => Box::pin(future::ready(Ok(f()))),
            Self::FromRequest(f) => Box::pin(future::ready(Ok(f(&request)))),
            Self::FromRequestError(f) => Box::pin(future::ready(Ok(f(&request, error)))),
            Self::Service(backup) => backup(request),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::ValueFn(_) => "value_fn",
            Self::FromRequest(_) => "from_request",
            Self::FromRequestError(_) => "from_request_error",
            Self::Service(_) => "service",
        }
    }
}
