//! SQLite Statistics Store
//!
//! Implements StatisticsStore on a SQLite database file. Every process that
//! opens the same file shares circuit state. Increments are single upsert
//! statements, so concurrent writers never lose an update.

use crate::domain::errors::StoreError;
use crate::domain::ports::StatisticsStore;
use crate::domain::value_objects::{Metric, ServiceName};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS circuit_stats (
    key   TEXT PRIMARY KEY,
    value INTEGER NOT NULL DEFAULT 0
)";

/// How long a writer waits for another process holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed statistics store.
///
/// Blocking SQLite calls run on Tokio's blocking pool.
#[derive(Clone)]
pub struct SqliteStatisticsStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStatisticsStore {
    /// Open (and create if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Private in-memory database, mostly useful for tests.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute(SCHEMA, [])?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<R, F>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || f(&conn.lock())).await?
    }

    async fn get(&self, key: String) -> Result<u64, StoreError> {
        self.with_conn(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM circuit_stats WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, Value>(0),
                )
                .optional()?;
            decode(&key, value)
        })
        .await
    }

    async fn set(&self, key: String, value: i64) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO circuit_stats (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
        .await
    }

    async fn increment(&self, key: String) -> Result<(), StoreError> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO circuit_stats (key, value) VALUES (?1, 1)
                 ON CONFLICT(key) DO UPDATE SET value = value + 1",
                params![key],
            )?;
            Ok(())
        })
        .await
    }
}

/// Interpret a stored cell as a counter. A missing row reads as zero.
fn decode(key: &str, value: Option<Value>) -> Result<u64, StoreError> {
    let corrupt = |v: String| StoreError::Corrupt {
        key: key.to_string(),
        value: v,
    };

    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Integer(i)) => u64::try_from(i).map_err(|_| corrupt(i.to_string())),
        Some(Value::Text(t)) => t.trim().parse::<u64>().map_err(|_| corrupt(t)),
        Some(Value::Real(r)) => Err(corrupt(r.to_string())),
        Some(Value::Blob(b)) => Err(corrupt(format!("<{} byte blob>", b.len()))),
    }
}

#[async_trait]
impl StatisticsStore for SqliteStatisticsStore {
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
        self.set(service.key(Metric::IsOpen), i64::from(open)).await
    }

    async fn add_success(&self, service: &ServiceName) -> Result<(), StoreError> {
        self.increment(service.key(Metric::SuccessCount)).await
    }

    async fn add_failure(&self, service: &ServiceName) -> Result<(), StoreError> {
        self.increment(service.key(Metric::FailureCount)).await
    }
}
