use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tower::{Layer, Service, ServiceExt, service_fn};
use std::sync::Mutex;
use tower_fault_tolerance::{InvocationCounter, Policy, execute, operation_fn};
use tower_fault_tolerance_core::{Attempt, CancellationToken};
use tower_fault_tolerance_timeout::TimeoutLayer;

#[tokio::test(start_paused = true)]
async fn timed_out_attempts_are_aborted_by_default() {
    let finished = Arc::new(AtomicBool::new(false));
    let f = Arc::clone(&finished);
    let mut service = TimeoutLayer::new(Duration::from_millis(100)).layer(service_fn(
        move |_: Attempt<()>| {
            let f = Arc::clone(&f);
            async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                f.store(true, Ordering::SeqCst);
                Ok::<_, ()>(())
            }
        },
    ));

    let token = CancellationToken::new();
    let result = service
        .ready()
        .await
        .unwrap()
        .call(Attempt::new(1, (), token.clone()))
        .await;
    assert!(result.unwrap_err().is_timeout());
    assert!(token.is_cancelled());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn running_attempts_can_observe_cancellation() {
    let (tx, rx) = oneshot::channel();
    let tx = Arc::new(Mutex::new(Some(tx)));
    let mut service = TimeoutLayer::builder()
        .timeout_duration(Duration::from_millis(20))
        .cancel_running_attempt(false)
        .build()
        .layer(service_fn(move |attempt: Attempt<()>| {
            let tx = Arc::clone(&tx);
            async move {
                attempt.cancelled().await;
                if let Some(tx) = tx.lock().unwrap().take() {
                    let _ = tx.send(attempt.number);
                }
                Err::<(), _>("cancelled")
            }
        }));

    let result = service.ready().await.unwrap().call(Attempt::first(())).await;
    assert!(result.unwrap_err().is_timeout());

    let observed = tokio::time::timeout(Duration::from_secs(5), rx).await;
    assert_eq!(observed.unwrap().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn completed_attempts_are_not_cancelled() {
    let mut service = TimeoutLayer::new(Duration::from_millis(100))
        .layer(service_fn(|_: Attempt<()>| async { Ok::<_, ()>("done") }));

    let token = CancellationToken::new();
    let result = service
        .ready()
        .await
        .unwrap()
        .call(Attempt::new(1, (), token.clone()))
        .await;

    assert_eq!(result, Ok("done"));
    assert!(!token.is_cancelled());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_caller_aborts_the_running_attempt() {
    let finished = Arc::new(AtomicBool::new(false));
    let f = Arc::clone(&finished);
    let mut service = TimeoutLayer::new(Duration::from_millis(500)).layer(service_fn(
        move |_: Attempt<()>| {
            let f = Arc::clone(&f);
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                f.store(true, Ordering::SeqCst);
                Ok::<_, ()>(())
            }
        },
    ));

    let token = CancellationToken::new();
    let call = service
        .ready()
        .await
        .unwrap()
        .call(Attempt::new(1, (), token.clone()));
    let abandoned = tokio::time::timeout(Duration::from_millis(50), call).await;
    assert!(abandoned.is_err());
    assert!(token.is_cancelled());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_caller_lets_detached_attempts_finish() {
    let finished = Arc::new(AtomicBool::new(false));
    let f = Arc::clone(&finished);
    let mut service = TimeoutLayer::builder()
        .timeout_duration(Duration::from_millis(500))
        .cancel_running_attempt(false)
        .build()
        .layer(service_fn(move |_: Attempt<()>| {
            let f = Arc::clone(&f);
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                f.store(true, Ordering::SeqCst);
                Ok::<_, ()>(())
            }
        }));

    let token = CancellationToken::new();
    let call = service
        .ready()
        .await
        .unwrap()
        .call(Attempt::new(1, (), token.clone()));
    let abandoned = tokio::time::timeout(Duration::from_millis(50), call).await;
    assert!(abandoned.is_err());
    assert!(token.is_cancelled());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(finished.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn dropping_execute_stops_the_in_flight_attempt() {
    let finished = Arc::new(AtomicBool::new(false));
    let seen: Arc<Mutex<Option<CancellationToken>>> = Arc::new(Mutex::new(None));
    let policy = Policy::<&'static str, String, ()>::builder()
        .max_retries(1)
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let counter = InvocationCounter::new();

    let f = Arc::clone(&finished);
    let s = Arc::clone(&seen);
    let operation = operation_fn(move |attempt: Attempt<&'static str>| {
        let f = Arc::clone(&f);
        let s = Arc::clone(&s);
        async move {
            *s.lock().unwrap() = Some(attempt.cancellation().clone());
            tokio::time::sleep(Duration::from_millis(200)).await;
            f.store(true, Ordering::SeqCst);
            Ok::<_, ()>(attempt.request.to_string())
        }
    });

    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        execute(&policy, &counter, operation, "serviceC"),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(counter.get(), 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!finished.load(Ordering::SeqCst));
    let token = seen.lock().unwrap().take().unwrap();
    assert!(token.is_cancelled());
}
