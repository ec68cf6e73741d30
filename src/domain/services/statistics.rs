//! Service Statistics
//!
//! A statistics store bound to one service, plus the metrics derived from
//! its raw counters. Derived values are computed here, once, for every
//! backend.

use crate::domain::errors::StoreError;
use crate::domain::ports::StatisticsStore;
use crate::domain::value_objects::{CircuitState, ServiceName};
use serde::Serialize;
use std::sync::Arc;

/// A [`StatisticsStore`] bound to a normalized service name.
#[derive(Clone)]
pub struct ServiceStatistics {
    store: Arc<dyn StatisticsStore>,
    service: ServiceName,
}

impl ServiceStatistics {
    /// Bind `store` to `service`. The name is normalized here.
    pub fn bind(store: Arc<dyn StatisticsStore>, service: &str) -> Self {
        Self {
            store,
            service: ServiceName::new(service),
        }
    }

    pub fn service(&self) -> &ServiceName {
        &self.service
    }

    pub async fn is_open(&self) -> Result<bool, StoreError> {
        self.store.is_open(&self.service).await
    }

    pub async fn get_failed_requests(&self) -> Result<u64, StoreError> {
        self.store.get_failed_requests(&self.service).await
    }

    pub async fn get_successful_requests(&self) -> Result<u64, StoreError> {
        self.store.get_successful_requests(&self.service).await
    }

    pub async fn clear_failed_requests(&self) -> Result<(), StoreError> {
        self.store.clear_failed_requests(&self.service).await
    }

    pub async fn clear_successful_requests(&self) -> Result<(), StoreError> {
        self.store.clear_successful_requests(&self.service).await
    }

    pub async fn toggle_circuit(&self, open: bool) -> Result<(), StoreError> {
        self.store.toggle_circuit(&self.service, open).await
    }

    pub async fn add_success(&self) -> Result<(), StoreError> {
        self.store.add_success(&self.service).await
    }

    pub async fn add_failure(&self) -> Result<(), StoreError> {
        self.store.add_failure(&self.service).await
    }

    /// Read both counters once.
    pub async fn request_counts(&self) -> Result<RequestCounts, StoreError> {
        let failures = self.get_failed_requests().await?;
        let successes = self.get_successful_requests().await?;
        Ok(RequestCounts { failures, successes })
    }

    /// Failures plus successes.
    pub async fn get_total_requests(&self) -> Result<u64, StoreError> {
        Ok(self.request_counts().await?.total())
    }

    /// Failures as a percentage of all recorded requests; `0.0` when nothing
    /// has been recorded.
    pub async fn get_error_percentage(&self) -> Result<f64, StoreError> {
        Ok(self.request_counts().await?.error_percentage())
    }

    /// Zero both counters. The open flag is left untouched.
    pub async fn reset_request_stats(&self) -> Result<(), StoreError> {
        self.clear_failed_requests().await?;
        self.clear_successful_requests().await
    }

    /// Read every stored value for this service at once.
    ///
    /// `state` reflects only the stored flag, not the error-rate check.
    pub async fn snapshot(&self) -> Result<CircuitSnapshot, StoreError> {
        let is_open = self.is_open().await?;
        let counts = self.request_counts().await?;

        Ok(CircuitSnapshot {
            service: self.service.clone(),
            state: if is_open {
                CircuitState::Open
            } else {
                CircuitState::Closed
            },
            successes: counts.successes,
            failures: counts.failures,
            total_requests: counts.total(),
            error_percentage: counts.error_percentage(),
        })
    }
}

impl std::fmt::Debug for ServiceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceStatistics")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

/// The two raw counters of one service, read together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestCounts {
    pub failures: u64,
    pub successes: u64,
}

impl RequestCounts {
    pub fn total(&self) -> u64 {
        self.failures.saturating_add(self.successes)
    }

    /// `0.0` when the total is zero.
    pub fn error_percentage(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        100.0 * (self.failures as f64 / total as f64)
    }
}

/// Point-in-time view of one service's circuit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitSnapshot {
    pub service: ServiceName,
    pub state: CircuitState,
    pub successes: u64,
    pub failures: u64,
    pub total_requests: u64,
    pub error_percentage: f64,
}
