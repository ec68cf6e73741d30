//! Statistics Store Port
//!
//! Defines the interface a backend must satisfy to persist circuit state.

use crate::domain::errors::StoreError;
use crate::domain::value_objects::ServiceName;
use async_trait::async_trait;

/// Raw counters and the forced-open flag, per service.
///
/// This is an outbound port. Backends implement only these primitives;
/// derived metrics are computed once by
/// [`ServiceStatistics`](crate::domain::services::ServiceStatistics).
/// A service that has never been written reads as zero counters and a
/// closed flag.
///
/// Every operation may suspend on I/O and may fail with
/// [`StoreError::Unavailable`].
#[async_trait]
pub trait StatisticsStore: Send + Sync {
    /// Whether the circuit has been explicitly marked open.
    async fn is_open(&self, service: &ServiceName) -> Result<bool, StoreError>;

    /// Number of failed requests since the last clear.
    async fn get_failed_requests(&self, service: &ServiceName) -> Result<u64, StoreError>;

    /// Number of successful requests since the last clear.
    async fn get_successful_requests(&self, service: &ServiceName) -> Result<u64, StoreError>;

    async fn clear_failed_requests(&self, service: &ServiceName) -> Result<(), StoreError>;

    async fn clear_successful_requests(&self, service: &ServiceName) -> Result<(), StoreError>;

    /// Set the forced-open flag.
    async fn toggle_circuit(&self, service: &ServiceName, open: bool) -> Result<(), StoreError>;

    /// Increment the success counter.
    ///
    /// Concurrent increments against the same backend must never be lost.
    async fn add_success(&self, service: &ServiceName) -> Result<(), StoreError>;

    /// Increment the failure counter. Same atomicity contract as `add_success`.
    async fn add_failure(&self, service: &ServiceName) -> Result<(), StoreError>;
}
