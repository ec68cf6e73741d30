//! Integration tests for CircuitBreaker over shared statistics stores
//!
//! Two breakers bound to the same service and backend must behave as one
//! circuit, whether the backend is process memory or a SQLite file.

use circuit_breaker::{
    load_config_from, BreakerConfig, BreakerError, CallError, CircuitBreaker, CircuitState,
    DashMapStatisticsStore, ExecuteOutcome, SqliteStatisticsStore, StatisticsStore,
};
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn config(threshold: u64, allowed: f64) -> BreakerConfig {
    BreakerConfig {
        request_count_threshold: threshold,
        allowed_error_percentage: allowed,
        ..Default::default()
    }
}

async fn succeed() -> Result<(), CallError> {
    Ok(())
}

async fn fail() -> Result<(), CallError> {
    Err("connection reset by peer".into())
}

/// Threshold 2 / 50%: one failure and one success opens the circuit.
#[tokio::test]
async fn test_scenario_half_failures_open() {
    let cb = CircuitBreaker::new("svc", Arc::new(DashMapStatisticsStore::new()), config(2, 50.0))
        .with_fallback(|_| {});

    cb.execute(fail).await.unwrap();
    cb.execute(succeed).await.unwrap();

    assert!(cb.is_open().await.unwrap());
    assert_eq!(cb.state().await.unwrap(), CircuitState::Open);
}

/// Threshold 2 / 50%: one failure and three successes keeps it closed.
#[tokio::test]
async fn test_scenario_quarter_failures_stay_closed() {
    let cb = CircuitBreaker::new("svc", Arc::new(DashMapStatisticsStore::new()), config(2, 50.0))
        .with_fallback(|_| {});

    // Successes first so the circuit never trips on the way
    for _ in 0..3 {
        cb.execute(succeed).await.unwrap();
    }
    cb.execute(fail).await.unwrap();

    assert_eq!(cb.statistics().get_error_percentage().await.unwrap(), 25.0);
    assert!(!cb.is_open().await.unwrap());
}

/// Threshold 5: three failures are not enough evidence.
#[tokio::test]
async fn test_scenario_small_sample() {
    let cb = CircuitBreaker::new("svc", Arc::new(DashMapStatisticsStore::new()), config(5, 50.0))
        .with_fallback(|_| {});

    for _ in 0..3 {
        assert_eq!(cb.execute(fail).await.unwrap(), ExecuteOutcome::Failed);
    }

    assert!(!cb.is_open().await.unwrap());
}

/// A malformed error-rate limit in the environment must not trip a healthy
/// circuit in the shared store.
#[tokio::test]
async fn test_nan_error_rate_from_env_keeps_healthy_circuit_closed() {
    let cfg = load_config_from(|key: &str| {
        (key == "CIRCUIT_BREAKER_ALLOWED_ERROR_PERCENTAGE").then(|| "NaN".to_string())
    })
    .unwrap();
    let store = Arc::new(DashMapStatisticsStore::new());
    let cb = CircuitBreaker::new("svc", store, cfg.breaker).with_fallback(|_| {});

    cb.execute(succeed).await.unwrap();
    cb.execute(succeed).await.unwrap();

    assert_eq!(cb.statistics().get_error_percentage().await.unwrap(), 0.0);
    assert!(!cb.is_open().await.unwrap());
    assert!(!cb.statistics().is_open().await.unwrap());
}

/// Breakers whose names normalize identically share one circuit.
#[tokio::test]
async fn test_memory_store_shared_between_breakers() {
    let store: Arc<dyn StatisticsStore> = Arc::new(DashMapStatisticsStore::new());
    let a = CircuitBreaker::new("Payments API", store.clone(), config(2, 50.0)).with_fallback(|_| {});
    let b = CircuitBreaker::new("payments_api", store, config(2, 50.0)).with_fallback(|_| {});

    a.execute(fail).await.unwrap();
    a.execute(fail).await.unwrap();

    assert_eq!(b.execute(succeed).await.unwrap(), ExecuteOutcome::ShortCircuited);
    assert_eq!(b.statistics().get_failed_requests().await.unwrap(), 2);
}

/// A circuit opened through one SQLite connection is seen by another.
#[tokio::test]
async fn test_sqlite_store_shared_between_processes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("circuits.db");

    let first = CircuitBreaker::new(
        "Inventory",
        Arc::new(SqliteStatisticsStore::open(&path).unwrap()),
        config(2, 50.0),
    )
    .with_fallback(|_| {});
    let second = CircuitBreaker::new(
        "inventory",
        Arc::new(SqliteStatisticsStore::open(&path).unwrap()),
        config(2, 50.0),
    );

    first.execute(fail).await.unwrap();
    first.execute(fail).await.unwrap();
    assert!(first.is_open().await.unwrap());

    // The second breaker has no fallback, so denial is an error
    let err = second.execute(succeed).await.unwrap_err();
    assert!(matches!(err, BreakerError::NoFallbackAvailable { .. }));
    assert_eq!(
        err.to_string(),
        "Service inventory is short-circuited and no fallback is available."
    );
}

/// The breaker never clears the open flag; an operator close does, and the
/// next success while the flag is still set resets the counters.
#[tokio::test]
async fn test_recovery_requires_manual_close() {
    let store = Arc::new(SqliteStatisticsStore::in_memory().unwrap());
    let cb = CircuitBreaker::new("search", store, config(2, 50.0)).with_fallback(|_| {});

    cb.execute(fail).await.unwrap();
    cb.execute(fail).await.unwrap();
    assert_eq!(cb.execute(succeed).await.unwrap(), ExecuteOutcome::ShortCircuited);
    assert_eq!(cb.execute(succeed).await.unwrap(), ExecuteOutcome::ShortCircuited);

    // Counters still carry the failures, so close and reset together
    cb.statistics().toggle_circuit(false).await.unwrap();
    cb.statistics().reset_request_stats().await.unwrap();

    assert_eq!(cb.execute(succeed).await.unwrap(), ExecuteOutcome::Completed(()));
    assert!(!cb.is_open().await.unwrap());
    assert_eq!(cb.statistics().get_successful_requests().await.unwrap(), 1);
}

/// Concurrent callers never lose a recorded outcome.
#[tokio::test]
async fn test_concurrent_execute_counts_every_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("circuits.db");
    let store = Arc::new(SqliteStatisticsStore::open(&path).unwrap());

    // Threshold high enough that the circuit never opens mid-test
    let cb = Arc::new(CircuitBreaker::new("ledger", store, config(10_000, 50.0)).with_fallback(|_| {}));
    let fallbacks = Arc::new(AtomicUsize::new(0));

    let tasks = (0..40).map(|i| {
        let cb = cb.clone();
        let fallbacks = fallbacks.clone();
        tokio::spawn(async move {
            let outcome = if i % 4 == 0 {
                cb.execute(fail).await.unwrap()
            } else {
                cb.execute(succeed).await.unwrap()
            };
            if outcome == ExecuteOutcome::Failed {
                fallbacks.fetch_add(1, Ordering::SeqCst);
            }
        })
    });

    for result in join_all(tasks).await {
        result.unwrap();
    }

    assert_eq!(cb.statistics().get_failed_requests().await.unwrap(), 10);
    assert_eq!(cb.statistics().get_successful_requests().await.unwrap(), 30);
    assert_eq!(fallbacks.load(Ordering::SeqCst), 10);
}
