//! Three flaky services run under different policies.
//!
//! Run with: cargo run --example fallback_client -p tower-fault-tolerance --features tracing
//!
//! - `serviceA` always fails; one retry, then a fallback value
//! - `serviceB` always fails; two retries, then a fallback value
//! - `serviceC` is too slow; each attempt times out after 500ms, one retry,
//!   then a fallback value

use std::time::{Duration, Instant};
use tower_fault_tolerance::{operation_fn, Attempt, Executor, InvocationCounter, Policy};

#[derive(Debug, Clone)]
struct ServiceError(String);

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ServiceError {}

type ClientPolicy = Policy<&'static str, String, ServiceError>;

async fn failing_service(attempt: Attempt<&'static str>) -> Result<String, ServiceError> {
    println!("  {} attempt {}: connecting", attempt.request, attempt.number);
    Err(ServiceError("Connection failed".to_string()))
}

async fn slow_service(attempt: Attempt<&'static str>) -> Result<String, ServiceError> {
    println!("  {} attempt {}: working", attempt.request, attempt.number);
    tokio::select! {
        _ = attempt.cancelled() => Err(ServiceError("cancelled".to_string())),
        _ = tokio::time::sleep(Duration::from_secs(2)) => Ok("slow response".to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .init();

    println!("Fallback Client");
    println!("===============\n");

    let service_a = Executor::new(
        ClientPolicy::builder()
            .name("serviceA")
            .max_retries(1)
            .fallback(|service| format!("fallback for {}", service))
            .build()?,
    );
    let counter_a = InvocationCounter::new();
    let result = service_a
        .execute(operation_fn(failing_service), "serviceA", &counter_a)
        .await?;
    println!("serviceA -> {:?} after {} calls\n", result, counter_a.get());

    let service_b = Executor::new(
        ClientPolicy::builder()
            .name("serviceB")
            .max_retries(2)
            .delay(Duration::from_millis(100))
            .on_retry(|attempt, delay| println!("  retrying after attempt {} in {:?}", attempt, delay))
            .fallback(|service| format!("fallback for {}", service))
            .build()?,
    );
    let counter_b = InvocationCounter::new();
    let result = service_b
        .execute(operation_fn(failing_service), "serviceB", &counter_b)
        .await?;
    println!("serviceB -> {:?} after {} calls\n", result, counter_b.get());

    let service_c = Executor::new(
        ClientPolicy::builder()
            .name("serviceC")
            .max_retries(1)
            .timeout(Duration::from_millis(500))
            .on_timeout(|attempt| println!("  attempt {} timed out", attempt))
            .fallback(|service| format!("fallback for {}", service))
            .build()?,
    );
    let counter_c = InvocationCounter::new();
    let start = Instant::now();
    let result = service_c
        .execute(operation_fn(slow_service), "serviceC", &counter_c)
        .await?;
    println!(
        "serviceC -> {:?} after {} calls in {:?}",
        result,
        counter_c.get(),
        start.elapsed()
    );

    Ok(())
}
