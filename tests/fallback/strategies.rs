use super::TestError;
use futures::future::{self, BoxFuture};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::{Layer, Service, ServiceExt, service_fn};
use tower_fault_tolerance_fallback::{FallbackError, FallbackLayer, FallbackProvider};

fn unavailable(_: String) -> future::Ready<Result<String, TestError>> {
    future::ready(Err(TestError::new("Service unavailable", 503)))
}

#[tokio::test]
async fn value_fn_builds_a_fresh_value_each_time() {
    let built = Arc::new(AtomicUsize::new(0));
    let b = Arc::clone(&built);
    let layer = FallbackLayer::<String, String, TestError, Infallible>::value_fn(move || {
        format!("fallback #{}", b.fetch_add(1, Ordering::SeqCst) + 1)
    });
    let mut service = layer.layer(service_fn(unavailable));

    let first = service.ready().await.unwrap().call("a".to_string()).await;
    let second = service.ready().await.unwrap().call("b".to_string()).await;

    assert_eq!(first, Ok("fallback #1".to_string()));
    assert_eq!(second, Ok("fallback #2".to_string()));
}

#[tokio::test]
async fn from_request_sees_the_original_request() {
    let layer = FallbackLayer::<String, String, TestError, Infallible>::from_request(
        |req: &String| format!("cached {}", req),
    );
    let mut service = layer.layer(service_fn(unavailable));

    let response = service.ready().await.unwrap().call("serviceA".to_string()).await;

    assert_eq!(response, Ok("cached serviceA".to_string()));
}

#[tokio::test]
async fn from_request_error_sees_both() {
    let layer = FallbackLayer::<String, String, TestError, Infallible>::from_request_error(
        |req: &String, err: &TestError| format!("{} answered {} for {}", req, err.code, err.message),
    );
    let mut service = layer.layer(service_fn(unavailable));

    let response = service.ready().await.unwrap().call("serviceB".to_string()).await;

    assert_eq!(
        response,
        Ok("serviceB answered 503 for Service unavailable".to_string())
    );
}

#[tokio::test]
async fn backup_service_success_and_failure() {
    let healthy = FallbackLayer::<String, String, TestError, TestError>::service(|req: String| async move {
        Ok(format!("backup handled {}", req))
    });
    let mut service = healthy.layer(service_fn(unavailable));
    let response = service.ready().await.unwrap().call("x".to_string()).await;
    assert_eq!(response, Ok("backup handled x".to_string()));

    let broken = FallbackLayer::<String, String, TestError, TestError>::service(|_: String| async {
        Err(TestError::new("backup down", 500))
    });
    let mut service = broken.layer(service_fn(unavailable));
    let err = service.ready().await.unwrap().call("x".to_string()).await.unwrap_err();
    assert_eq!(
        err,
        FallbackError::FallbackFailed(TestError::new("backup down", 500))
    );
}

struct StaleCache;

impl FallbackProvider<String, TestError> for StaleCache {
    type Response = String;
    type Error = Infallible;

    fn produce(
        &self,
        request: String,
        error: &TestError,
    ) -> BoxFuture<'static, Result<String, Infallible>> {
        let code = error.code;
        Box::pin(async move { Ok(format!("stale {} ({})", request, code)) })
    }

    fn kind(&self) -> &'static str {
        "stale_cache"
    }
}

#[tokio::test]
async fn custom_providers_report_their_kind() {
    let kinds = Arc::new(std::sync::Mutex::new(Vec::new()));
    let k = Arc::clone(&kinds);
    let layer = FallbackLayer::<String, String, TestError, Infallible>::builder()
        .provider(StaleCache)
        .on_applied(move |kind| k.lock().unwrap().push(kind))
        .build();
    let mut service = layer.layer(service_fn(unavailable));

    let response = service.ready().await.unwrap().call("profile".to_string()).await;

    assert_eq!(response, Ok("stale profile (503)".to_string()));
    assert_eq!(*kinds.lock().unwrap(), vec!["stale_cache"]);
}

#[tokio::test]
async fn handle_predicate_selects_errors() {
    let layer = FallbackLayer::<String, String, TestError, Infallible>::builder()
        .value("fallback".to_string())
        .handle(|e: &TestError| e.code >= 500)
        .build();

    let mut server_error = layer.layer(service_fn(unavailable));
    let response = server_error.ready().await.unwrap().call("x".to_string()).await;
    assert_eq!(response, Ok("fallback".to_string()));

    let mut client_error = layer.layer(service_fn(|_: String| async {
        Err::<String, _>(TestError::new("Not found", 404))
    }));
    let err = client_error.ready().await.unwrap().call("x".to_string()).await.unwrap_err();
    assert_eq!(err, FallbackError::Inner(TestError::new("Not found", 404)));
}
