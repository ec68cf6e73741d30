//! Circuit Breaker
//!
//! Guards calls to an unreliable service. Decides whether a call may run,
//! records its outcome, and diverts denied or failed calls to a fallback.
//!
//! The breaker keeps no circuit state of its own: everything lives in the
//! bound [`ServiceStatistics`], so breakers pointed at the same backend and
//! service share one circuit.
//!
//! Concurrent `execute` calls are not serialized. Two callers can both pass
//! the permission check before either records an outcome; the backend only
//! guarantees that no increment is lost.

use crate::config::BreakerConfig;
use crate::domain::errors::{BreakerError, CallError, CallTimedOut, StoreError};
use crate::domain::ports::StatisticsStore;
use crate::domain::services::{CircuitSnapshot, ServiceStatistics};
use crate::domain::value_objects::{CircuitState, ServiceName};
use std::future::Future;
use std::sync::Arc;

/// Why the fallback is being invoked.
#[derive(Debug, Clone, Copy)]
pub enum FallbackReason<'a> {
    /// The circuit is open; the call never ran.
    ShortCircuited,
    /// The call ran and failed.
    CallFailed(&'a CallError),
}

/// Substitute behaviour for denied or failed calls.
pub type FallbackHandler = Arc<dyn Fn(FallbackReason<'_>) + Send + Sync>;

/// Result of [`CircuitBreaker::execute`] when no error escaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteOutcome<T> {
    /// The call ran and succeeded.
    Completed(T),
    /// The circuit denied the call and the fallback ran instead.
    ShortCircuited,
    /// The call failed, the failure was recorded and the fallback ran.
    Failed,
}

/// Circuit breaker bound to one service.
pub struct CircuitBreaker {
    name: String,
    statistics: ServiceStatistics,
    config: BreakerConfig,
    fallback: Option<FallbackHandler>,
}

impl CircuitBreaker {
    /// Create a breaker for `service`, binding `store` to its normalized name.
    pub fn new(service: &str, store: Arc<dyn StatisticsStore>, config: BreakerConfig) -> Self {
        Self {
            name: service.to_string(),
            statistics: ServiceStatistics::bind(store, service),
            config,
            fallback: None,
        }
    }

    /// Install the fallback invoked on denied or failed calls.
    pub fn with_fallback<F>(mut self, fallback: F) -> Self
    where
        F: Fn(FallbackReason<'_>) + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(fallback));
        self
    }

    /// The service name as given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The normalized storage name.
    pub fn service(&self) -> &ServiceName {
        self.statistics.service()
    }

    pub fn statistics(&self) -> &ServiceStatistics {
        &self.statistics
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    /// The `enabled` switch from the configuration.
    ///
    /// Not consulted by [`is_open`](Self::is_open) or
    /// [`execute`](Self::execute); callers that want a kill switch check it
    /// themselves.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Check whether the circuit is open.
    ///
    /// A stored open flag wins outright. Otherwise the circuit opens, and the
    /// flag is persisted, once at least `request_count_threshold` requests
    /// were recorded and the error percentage reaches
    /// `allowed_error_percentage`.
    pub async fn is_open(&self) -> Result<bool, StoreError> {
        if self.statistics.is_open().await? {
            return Ok(true);
        }

        let counts = self.statistics.request_counts().await?;
        let total = counts.total();
        if total < self.config.request_count_threshold {
            return Ok(false);
        }

        let error_percentage = counts.error_percentage();
        if error_percentage < self.config.allowed_error_percentage {
            return Ok(false);
        }

        self.statistics.toggle_circuit(true).await?;
        tracing::warn!(
            "circuit breaker for {} opened (requests={} error_rate={:.1}%)",
            self.service(),
            total,
            error_percentage
        );
        Ok(true)
    }

    /// Whether [`is_open`](Self::is_open) would report open for `snapshot`,
    /// without persisting anything.
    pub fn would_open(&self, snapshot: &CircuitSnapshot) -> bool {
        snapshot.state == CircuitState::Open
            || (snapshot.total_requests >= self.config.request_count_threshold
                && snapshot.error_percentage >= self.config.allowed_error_percentage)
    }

    /// Whether a call may run right now. Always `!is_open()`.
    pub async fn allow_request(&self) -> Result<bool, StoreError> {
        Ok(!self.is_open().await?)
    }

    /// Current state as decided by [`is_open`](Self::is_open).
    pub async fn state(&self) -> Result<CircuitState, StoreError> {
        if self.is_open().await? {
            Ok(CircuitState::Open)
        } else {
            Ok(CircuitState::Closed)
        }
    }

    /// Run `call` through the breaker.
    ///
    /// - Denied: the fallback runs, `call` is never invoked and no counter
    ///   moves.
    /// - Success: if the stored flag reads open the counters are reset, then
    ///   the success counter is incremented. The flag itself is left open;
    ///   closing it is an operator action (`toggle_circuit(false)`).
    /// - Failure: the failure counter is incremented and the fallback runs
    ///   with the error.
    ///
    /// Store errors are returned as-is. Without a fallback, a denied or
    /// failed call yields [`BreakerError::NoFallbackAvailable`].
    pub async fn execute<F, Fut, T, E>(&self, call: F) -> Result<ExecuteOutcome<T>, BreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<CallError>,
    {
        if !self.allow_request().await? {
            tracing::debug!("request to {} short-circuited", self.service());
            self.execute_fallback(None)?;
            return Ok(ExecuteOutcome::ShortCircuited);
        }

        match self.run(call).await {
            Ok(value) => {
                if self.statistics.is_open().await? {
                    self.statistics.toggle_circuit(true).await?;
                    self.statistics.reset_request_stats().await?;
                    tracing::info!(
                        "circuit breaker for {} saw a success while open, counters reset",
                        self.service()
                    );
                }
                self.statistics.add_success().await?;
                Ok(ExecuteOutcome::Completed(value))
            }
            Err(error) => {
                self.statistics.add_failure().await?;
                tracing::debug!("call to {} failed: {}", self.service(), error);
                self.execute_fallback(Some(error))?;
                Ok(ExecuteOutcome::Failed)
            }
        }
    }

    async fn run<F, Fut, T, E>(&self, call: F) -> Result<T, CallError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<CallError>,
    {
        let Some(limit) = self.config.call_timeout() else {
            return call().await.map_err(Into::into);
        };

        match tokio::time::timeout(limit, call()).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(CallTimedOut {
                service: self.service().to_string(),
                elapsed_ms: limit.as_millis() as u64,
            }
            .into()),
        }
    }

    /// Hand a denied or failed call to the fallback.
    ///
    /// `error` is the call failure, or `None` when the circuit denied the
    /// call. Without a fallback this fails with
    /// [`BreakerError::NoFallbackAvailable`], keeping `error` as its source.
    pub fn execute_fallback(&self, error: Option<CallError>) -> Result<(), BreakerError> {
        if let Some(fallback) = &self.fallback {
            match &error {
                Some(e) => fallback(FallbackReason::CallFailed(e)),
                None => fallback(FallbackReason::ShortCircuited),
            }
            return Ok(());
        }

        let reason = match &error {
            Some(e) => e.to_string(),
            None => format!("Service {} is short-circuited", self.name),
        };

        Err(BreakerError::NoFallbackAvailable {
            message: format!("{} and no fallback is available.", reason),
            source: error,
        })
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("service", self.service())
            .field("config", &self.config)
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}
