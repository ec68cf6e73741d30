//! DashMap Statistics Store
//!
//! Implements StatisticsStore in process memory using DashMap and atomics.
//! Breakers share circuit state only when they share the same instance.

use crate::domain::errors::StoreError;
use crate::domain::ports::StatisticsStore;
use crate::domain::value_objects::ServiceName;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Circuit state for a single service.
#[derive(Debug, Default)]
struct ServiceCounters {
    /// Forced-open flag
    is_open: AtomicBool,
    /// Successful requests since last clear
    successes: AtomicU64,
    /// Failed requests since last clear
    failures: AtomicU64,
}

/// DashMap-backed statistics store.
///
/// Each service gets its own entry, created on first write. Reads of an
/// unknown service return zero/closed without creating an entry.
pub struct DashMapStatisticsStore {
    services: DashMap<ServiceName, ServiceCounters>,
}

impl DashMapStatisticsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    fn read<R>(&self, service: &ServiceName, f: impl Fn(&ServiceCounters) -> R) -> Option<R> {
        self.services.get(service).map(|c| f(&c))
    }

    fn write(&self, service: &ServiceName, f: impl FnOnce(&ServiceCounters)) {
        let entry = self.services.entry(service.clone()).or_default();
        f(&entry);
    }
}

impl Default for DashMapStatisticsStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatisticsStore for DashMapStatisticsStore {
    async fn is_open(&self, service: &ServiceName) -> Result<bool, StoreError> {
        Ok(self
            .read(service, |c| c.is_open.load(Ordering::SeqCst))
            .unwrap_or(false))
    }

    async fn get_failed_requests(&self, service: &ServiceName) -> Result<u64, StoreError> {
        Ok(self
            .read(service, |c| c.failures.load(Ordering::SeqCst))
            .unwrap_or(0))
    }

    async fn get_successful_requests(&self, service: &ServiceName) -> Result<u64, StoreError> {
        Ok(self
            .read(service, |c| c.successes.load(Ordering::SeqCst))
            .unwrap_or(0))
    }

    async fn clear_failed_requests(&self, service: &ServiceName) -> Result<(), StoreError> {
        self.write(service, |c| c.failures.store(0, Ordering::SeqCst));
        Ok(())
    }

    async fn clear_successful_requests(&self, service: &ServiceName) -> Result<(), StoreError> {
        self.write(service, |c| c.successes.store(0, Ordering::SeqCst));
        Ok(())
    }

    async fn toggle_circuit(&self, service: &ServiceName, open: bool) -> Result<(), StoreError> {
        self.write(service, |c| c.is_open.store(open, Ordering::SeqCst));
        Ok(())
    }

    async fn add_success(&self, service: &ServiceName) -> Result<(), StoreError> {
        self.write(service, |c| {
            c.successes.fetch_add(1, Ordering::SeqCst);
        });
        Ok(())
    }

    async fn add_failure(&self, service: &ServiceName) -> Result<(), StoreError> {
        self.write(service, |c| {
            c.failures.fetch_add(1, Ordering::SeqCst);
        });
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use tokio_test::block_on;

    fn svc(name: &str) -> ServiceName {
        ServiceName::new(name)
    }

    fn recorded(store: &DashMapStatisticsStore) -> Vec<ServiceName> {
        store.services.iter().map(|e| e.key().clone()).collect()
    }

    // ===== Counter Tests =====

    #[test]
    fn test_unknown_service_reads_empty() {
        let store = DashMapStatisticsStore::new();
        assert!(!block_on(store.is_open(&svc("nope"))).unwrap());
        assert_eq!(block_on(store.get_failed_requests(&svc("nope"))).unwrap(), 0);
        assert_eq!(block_on(store.get_successful_requests(&svc("nope"))).unwrap(), 0);
        assert!(recorded(&store).is_empty());
    }

    #[test]
    fn test_add_and_clear_counters() {
        let store = DashMapStatisticsStore::new();
        let s = svc("payments");

        block_on(store.add_success(&s)).unwrap();
        block_on(store.add_success(&s)).unwrap();
        block_on(store.add_failure(&s)).unwrap();

        assert_eq!(block_on(store.get_successful_requests(&s)).unwrap(), 2);
        assert_eq!(block_on(store.get_failed_requests(&s)).unwrap(), 1);

        block_on(store.clear_failed_requests(&s)).unwrap();
        assert_eq!(block_on(store.get_failed_requests(&s)).unwrap(), 0);
        assert_eq!(block_on(store.get_successful_requests(&s)).unwrap(), 2);

        block_on(store.clear_successful_requests(&s)).unwrap();
        assert_eq!(block_on(store.get_successful_requests(&s)).unwrap(), 0);

        // Cleared, not removed
        assert_eq!(recorded(&store), vec![s]);
    }

    #[test]
    fn test_toggle_circuit() {
        let store = DashMapStatisticsStore::new();
        let s = svc("payments");

        block_on(store.toggle_circuit(&s, true)).unwrap();
        assert!(block_on(store.is_open(&s)).unwrap());

        block_on(store.toggle_circuit(&s, false)).unwrap();
        assert!(!block_on(store.is_open(&s)).unwrap());
    }

    #[test]
    fn test_services_isolated() {
        let store = DashMapStatisticsStore::new();

        block_on(store.add_failure(&svc("a"))).unwrap();
        block_on(store.toggle_circuit(&svc("b"), true)).unwrap();

        assert_eq!(block_on(store.get_failed_requests(&svc("b"))).unwrap(), 0);
        assert!(!block_on(store.is_open(&svc("a"))).unwrap());
        assert_eq!(recorded(&store).len(), 2);
    }

    #[test]
    fn test_service_counters_default() {
        let counters = ServiceCounters::default();
        assert!(!counters.is_open.load(Ordering::Relaxed));
        assert_eq!(counters.successes.load(Ordering::Relaxed), 0);
        assert_eq!(counters.failures.load(Ordering::Relaxed), 0);
    }

    // ===== Concurrency Safety Tests =====

    #[test]
    fn test_concurrent_increments() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(DashMapStatisticsStore::new());
        let mut handles = vec![];

        for i in 0..10 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                let s = svc("backend-1");
                for _ in 0..100 {
                    if i % 2 == 0 {
                        block_on(store.add_success(&s)).unwrap();
                    } else {
                        block_on(store.add_failure(&s)).unwrap();
                    }
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(block_on(store.get_successful_requests(&svc("backend-1"))).unwrap(), 500);
        assert_eq!(block_on(store.get_failed_requests(&svc("backend-1"))).unwrap(), 500);
    }
}
