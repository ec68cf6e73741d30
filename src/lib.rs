//! Circuit Breaker Library
//!
//! Guards calls to unreliable services. Circuit state lives in a pluggable
//! statistics store so breakers in separate processes can share it.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;

// Re-export commonly used types
pub use adapters::outbound::{DashMapStatisticsStore, RedisStatisticsStore, SqliteStatisticsStore};
pub use application::{CircuitBreaker, ExecuteOutcome, FallbackHandler, FallbackReason};
pub use config::{load_config, load_config_from, BreakerConfig, Config, StoreKind};
pub use domain::errors::{BreakerError, CallError, StoreError};
pub use domain::ports::StatisticsStore;
pub use domain::services::{CircuitSnapshot, RequestCounts, ServiceStatistics};
pub use domain::value_objects::{CircuitState, ServiceName};
