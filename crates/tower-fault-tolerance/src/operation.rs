use std::future::Future;
use tower::util::{service_fn, ServiceFn};
use tower_fault_tolerance_core::Attempt;

/// Adapts an async closure over [`Attempt`]s into an operation.
///
/// Equivalent to [`tower::service_fn`], but pins the closure's argument to
/// `Attempt<Req>` so it can be written without annotations.
///
/// ```
/// use tower_fault_tolerance::operation_fn;
///
/// let operation = operation_fn(|attempt| async move {
///     let _: &u64 = &attempt.request;
///     Ok::<_, std::io::Error>(attempt.number)
/// });
/// # let _ = operation;
/// ```
pub fn operation_fn<F, Req, Fut, T, E>(f: F) -> ServiceFn<F>
where
    F: FnMut(Attempt<Req>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    service_fn(f)
}
