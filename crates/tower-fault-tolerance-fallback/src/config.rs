//! Configuration for the fallback service.

use crate::provider::{FallbackProvider, FallbackStrategy};
use crate::FallbackEvent;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;
use tower_fault_tolerance_core::{EventListeners, FnListener};

/// Predicate deciding whether an error is handled by the fallback.
pub type HandlePredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// A type-erased fallback provider.
pub type SharedProvider<Req, Res, E, F> =
    Arc<dyn FallbackProvider<Req, E, Response = Res, Error = F>>;

/// Configuration for the fallback service.
pub struct FallbackConfig<Req, Res, E, F> {
    pub(crate) name: String,
    pub(crate) provider: Option<SharedProvider<Req, Res, E, F>>,
    pub(crate) handle_predicate: Option<HandlePredicate<E>>,
    pub(crate) event_listeners: EventListeners<FallbackEvent>,
}

impl<Req, Res, E, F> FallbackConfig<Req, Res, E, F> {
    /// Returns true if a provider is configured.
    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Returns true if `error` should be passed to the provider.
    pub fn handles(&self, error: &E) -> bool {
        match &self.handle_predicate {
            Some(predicate) => predicate(error),
            None => true,
        }
    }
}

/// Builder for constructing a [`FallbackLayer`](crate::FallbackLayer).
pub struct FallbackConfigBuilder<Req, Res, E, F> {
    name: String,
    provider: Option<SharedProvider<Req, Res, E, F>>,
    handle_predicate: Option<HandlePredicate<E>>,
    event_listeners: EventListeners<FallbackEvent>,
}

impl<Req, Res, E, F> Default for FallbackConfigBuilder<Req, Res, E, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res, E, F> FallbackConfigBuilder<Req, Res, E, F> {
    /// Creates a new builder with no provider.
    ///
    /// Without a provider, every error propagates unchanged as
    /// [`FallbackError::Inner`](crate::FallbackError::Inner).
    pub fn new() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            provider: None,
            handle_predicate: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the name for this fallback instance.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Uses a custom provider.
    pub fn provider<P>(mut self, provider: P) -> Self
    where
        P: FallbackProvider<Req, E, Response = Res, Error = F> + 'static,
    {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Only applies the fallback to errors matching this predicate.
    ///
    /// Errors that don't match are propagated as-is.
    pub fn handle<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.handle_predicate = Some(Arc::new(predicate));
        self
    }

    /// Registers a callback invoked with the provider kind when a fallback
    /// response is produced.
    pub fn on_applied<C>(mut self, f: C) -> Self
    where
        C: Fn(&'static str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let FallbackEvent::Applied { strategy, .. } = event {
                f(*strategy);
            }
        }));
        self
    }

    /// Registers a callback invoked when an error is propagated without
    /// calling the provider.
    pub fn on_skipped<C>(mut self, f: C) -> Self
    where
        C: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let FallbackEvent::Skipped { .. } = event {
                f();
            }
        }));
        self
    }

    /// Adds an event listener.
    pub fn on_event<C>(mut self, listener: C) -> Self
    where
        C: Fn(&FallbackEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(listener));
        self
    }

    /// Builds the configuration.
    pub fn build_config(self) -> FallbackConfig<Req, Res, E, F> {
        FallbackConfig {
            name: self.name,
            provider: self.provider,
            handle_predicate: self.handle_predicate,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds the fallback layer.
    pub fn build(self) -> crate::FallbackLayer<Req, Res, E, F> {
        crate::FallbackLayer::new(self.build_config())
    }
}

impl<Req, Res, E, F> FallbackConfigBuilder<Req, Res, E, F>
where
    Req: 'static,
    Res: Clone + Send + Sync + 'static,
    E: 'static,
    F: Send + 'static,
{
    /// Uses one of the built-in strategies.
    pub fn strategy(self, strategy: FallbackStrategy<Req, Res, E, F>) -> Self {
        self.provider(strategy)
    }

    /// Falls back to a fixed value.
    pub fn value(self, value: Res) -> Self {
        self.strategy(FallbackStrategy::Value(value))
    }

    /// Falls back to a value built on demand.
    pub fn value_fn<C>(self, f: C) -> Self
    where
        C: Fn() -> Res + Send + Sync + 'static,
    {
        self.strategy(FallbackStrategy::ValueFn(Arc::new(f)))
    }

    /// Falls back to a value computed from the original request.
    pub fn from_request<C>(self, f: C) -> Self
    where
        C: Fn(&Req) -> Res + Send + Sync + 'static,
    {
        self.strategy(FallbackStrategy::FromRequest(Arc::new(f)))
    }

    /// Falls back to a value computed from the original request and error.
    pub fn from_request_error<C>(self, f: C) -> Self
    where
        C: Fn(&Req, &E) -> Res + Send + Sync + 'static,
    {
        self.strategy(FallbackStrategy::FromRequestError(Arc::new(f)))
    }

    /// Falls back to a backup operation, whose failure is reported as
    /// [`FallbackError::FallbackFailed`](crate::FallbackError::FallbackFailed).
    pub fn service<C, Fut>(self, backup: C) -> Self
    where
        C: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, F>> + Send + 'static,
    {
        let backup = move |req: Req| -> BoxFuture<'static, Result<Res, F>> { Box::pin(backup(req)) };
        self.strategy(FallbackStrategy::Service(Arc::new(backup)))
    }
}
