//! Redis Statistics Store
//!
//! Implements StatisticsStore on a Redis server so breakers in different
//! processes and hosts share circuit state. Counters are advanced with
//! `INCR`, which is atomic on the server.

use crate::domain::errors::StoreError;
use crate::domain::ports::StatisticsStore;
use crate::domain::value_objects::{Metric, ServiceName};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Redis-backed statistics store.
///
/// Holds a [`ConnectionManager`], which reconnects on its own after a
/// dropped connection. Operations issued while the server is unreachable
/// fail with [`StoreError::Unavailable`].
#[derive(Clone)]
pub struct RedisStatisticsStore {
    conn: ConnectionManager,
}

impl RedisStatisticsStore {
    /// Connect to `url` (e.g. `redis://:password@host:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("connected to redis statistics store");
        Ok(Self { conn })
    }

    async fn get(&self, key: String) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(&key).await?;
        parse_counter(&key, raw)
    }

    async fn set(&self, key: String, value: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(&key, value).await?;
        Ok(())
    }

    async fn incr(&self, key: String) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.incr::<_, _, i64>(&key, 1).await?;
        Ok(())
    }
}

/// Interpret a stored string as a counter or flag. A missing key reads as zero.
fn parse_counter(key: &str, raw: Option<String>) -> Result<u64, StoreError> {
    match raw {
        None => Ok(0),
        Some(v) if v.is_empty() => Ok(0),
        Some(v) => v.trim().parse().map_err(|_| StoreError::Corrupt {
            key: key.to_string(),
            value: v,
        }),
    }
}

#[async_trait]
impl StatisticsStore for RedisStatisticsStore {
    async fn is_open(&self, service: &ServiceName) -> Result<bool, StoreError> {
        Ok(self.get(service.key(Metric::IsOpen)).await? != 0)
    }

    async fn get_failed_requests(&self, service: &ServiceName) -> Result<u64, StoreError> {
        self.get(service.key(Metric::FailureCount)).await
    }

    async fn get_successful_requests(&self, service: &ServiceName) -> Result<u64, StoreError> {
        self.get(service.key(Metric::SuccessCount)).await
    }

    async fn clear_failed_requests(&self, service: &ServiceName) -> Result<(), StoreError> {
        self.set(service.key(Metric::FailureCount), 0).await
    }

    async fn clear_successful_requests(&self, service: &ServiceName) -> Result<(), StoreError> {
        self.set(service.key(Metric::SuccessCount), 0).await
    }

    async fn toggle_circuit(&self, service: &ServiceName, open: bool) -> Result<(), StoreError> {
        self.set(service.key(Metric::IsOpen), u64::from(open)).await
    }

    async fn add_success(&self, service: &ServiceName) -> Result<(), StoreError> {
        self.incr(service.key(Metric::SuccessCount)).await
    }

    async fn add_failure(&self, service: &ServiceName) -> Result<(), StoreError> {
        self.incr(service.key(Metric::FailureCount)).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_parse_counter_missing_key() {
        assert_eq!(parse_counter("k", None).unwrap(), 0);
        assert_eq!(parse_counter("k", Some(String::new())).unwrap(), 0);
    }

    #[test]
    fn test_parse_counter_values() {
        assert_eq!(parse_counter("k", Some("0".to_string())).unwrap(), 0);
        assert_eq!(parse_counter("k", Some("1".to_string())).unwrap(), 1);
        assert_eq!(parse_counter("k", Some("42".to_string())).unwrap(), 42);
    }

    #[test]
    fn test_parse_counter_corrupt() {
        let err = parse_counter("php_cb_svc_failure_counts", Some("-3".to_string())).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Corrupt { ref key, ref value }
                if key == "php_cb_svc_failure_counts" && value == "-3"
        ));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_url() {
        let result = RedisStatisticsStore::connect("not a url").await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
