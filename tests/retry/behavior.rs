use super::{TestError, flaky};
use futures::future::{self, Ready};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::time::Instant;
use tower::{Layer, Service, ServiceExt, service_fn};
use tower_fault_tolerance_core::{Attempt, FaultToleranceEvent};
use tower_fault_tolerance_retry::{RetryError, RetryLayer};

#[tokio::test]
async fn always_failing_operation_runs_max_retries_plus_one_times() {
    for max_retries in [0, 1, 2, 5] {
        let calls = Arc::new(AtomicUsize::new(0));
        let svc = service_fn(flaky(Arc::clone(&calls), usize::MAX, TestError::ConnectionFailed));
        let mut service = RetryLayer::<TestError>::builder()
            .max_retries(max_retries)
            .build()
            .layer(svc);

        let err = service.ready().await.unwrap().call(7).await.unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), max_retries + 1);
        assert_eq!(
            err,
            RetryError::Exhausted {
                attempts: max_retries + 1,
                last: TestError::ConnectionFailed,
            }
        );
    }
}

#[tokio::test]
async fn stops_at_first_success() {
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = service_fn(flaky(Arc::clone(&calls), 2, TestError::ConnectionFailed));
    let mut service = RetryLayer::<TestError>::builder()
        .max_retries(5)
        .build()
        .layer(svc);

    let response = service.ready().await.unwrap().call(7).await;

    assert_eq!(response, Ok(7));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn each_attempt_gets_the_original_request() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = Arc::clone(&seen);
    let svc = service_fn(move |attempt: Attempt<String>| {
        s.lock().unwrap().push((attempt.number, attempt.request.clone()));
        async { Err::<(), _>(TestError::ConnectionFailed) }
    });
    let mut service = RetryLayer::<TestError>::builder()
        .max_retries(2)
        .build()
        .layer(svc);

    let _ = service.ready().await.unwrap().call("serviceB".to_string()).await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (1, "serviceB".to_string()),
            (2, "serviceB".to_string()),
            (3, "serviceB".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn waits_between_attempts() {
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = service_fn(flaky(Arc::clone(&calls), usize::MAX, TestError::ConnectionFailed));
    let mut service = RetryLayer::<TestError>::builder()
        .max_retries(2)
        .delay(Duration::from_millis(100))
        .build()
        .layer(svc);

    let start = Instant::now();
    let _ = service.ready().await.unwrap().call(1).await;

    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn jitter_wider_than_delay_never_goes_negative() {
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = service_fn(flaky(Arc::clone(&calls), usize::MAX, TestError::ConnectionFailed));
    let delays = Arc::new(Mutex::new(Vec::new()));
    let d = Arc::clone(&delays);
    let mut service = RetryLayer::<TestError>::builder()
        .max_retries(20)
        .delay_with_jitter(Duration::from_millis(10), Duration::from_millis(50))
        .on_retry(move |_, delay| d.lock().unwrap().push(delay))
        .build()
        .layer(svc);

    let _ = service.ready().await.unwrap().call(1).await;

    let delays = delays.lock().unwrap();
    assert_eq!(delays.len(), 20);
    assert!(delays.iter().all(|d| *d <= Duration::from_millis(60)));
}

#[tokio::test]
async fn events_describe_the_sequence() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let e = Arc::clone(&events);
    let calls = Arc::new(AtomicUsize::new(0));
    let svc = service_fn(flaky(Arc::clone(&calls), usize::MAX, TestError::ConnectionFailed));
    let mut service = RetryLayer::<TestError>::builder()
        .name("serviceB")
        .max_retries(2)
        .on_event(move |event| {
            e.lock()
                .unwrap()
                .push(format!("{}:{}", event.pattern_name(), event.event_type()))
        })
        .build()
        .layer(svc);

    let _ = service.ready().await.unwrap().call(1).await;

    assert_eq!(
        *events.lock().unwrap(),
        vec!["serviceB:retry", "serviceB:retry", "serviceB:exhausted"]
    );
}

#[tokio::test]
async fn callbacks_report_attempt_totals() {
    let exhausted = Arc::new(AtomicUsize::new(0));
    let succeeded = Arc::new(AtomicUsize::new(0));
    let (x, s) = (Arc::clone(&exhausted), Arc::clone(&succeeded));
    let layer = RetryLayer::<TestError>::builder()
        .max_retries(1)
        .on_exhausted(move |attempts| x.store(attempts, Ordering::SeqCst))
        .on_success(move |attempts| s.store(attempts, Ordering::SeqCst))
        .build();

    let calls = Arc::new(AtomicUsize::new(0));
    let mut failing = layer.layer(service_fn(flaky(
        Arc::clone(&calls),
        usize::MAX,
        TestError::ConnectionFailed,
    )));
    let _ = failing.ready().await.unwrap().call(1).await;

    let mut recovering = layer.layer(service_fn(flaky(
        Arc::clone(&calls),
        2,
        TestError::ConnectionFailed,
    )));
    let _ = recovering.ready().await.unwrap().call(1).await;

    assert_eq!(exhausted.load(Ordering::SeqCst), 2);
    assert_eq!(succeeded.load(Ordering::SeqCst), 2);
}

/// A service that never becomes ready.
#[derive(Clone)]
struct Closed {
    calls: Arc<AtomicUsize>,
}

impl Service<Attempt<u32>> for Closed {
    type Response = u32;
    type Error = TestError;
    type Future = Ready<Result<u32, TestError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), TestError>> {
        Poll::Ready(Err(TestError::ConnectionFailed))
    }

    fn call(&mut self, attempt: Attempt<u32>) -> Self::Future {
        self.calls.fetch_add(1, Ordering::SeqCst);
        future::ready(Ok(attempt.request))
    }
}

#[tokio::test]
async fn readiness_failure_is_not_an_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));
    let exhausted = Arc::new(AtomicUsize::new(0));
    let e = Arc::clone(&exhausted);
    let mut service = RetryLayer::<TestError>::builder()
        .max_retries(3)
        .on_exhausted(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .layer(Closed {
            calls: Arc::clone(&calls),
        });

    let err = service.ready().await.err().unwrap();

    assert_eq!(err, RetryError::NotReady(TestError::ConnectionFailed));
    assert_eq!(err.attempts(), 0);
    assert_eq!(err.to_string(), "service not ready: Connection failed");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(exhausted.load(Ordering::SeqCst), 0);
}
