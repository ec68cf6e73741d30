//! Domain Errors
//!
//! Failures the statistics backends and the circuit breaker can report.

/// Failure raised by a guarded call.
pub type CallError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A statistics backend could not complete an operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection or I/O failure talking to the backend.
    #[error("statistics store unavailable: {0}")]
    Unavailable(String),
    /// A stored value could not be read back as a counter or flag.
    #[error("statistics store holds a non-integer value {value:?} at {key}")]
    Corrupt { key: String, value: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::Unavailable(format!("blocking store task failed: {}", e))
    }
}

/// A guarded call exceeded the configured call timeout.
#[derive(Debug, thiserror::Error)]
#[error("call to {service} timed out after {elapsed_ms}ms")]
pub struct CallTimedOut {
    pub service: String,
    pub elapsed_ms: u64,
}

/// Errors surfaced by [`CircuitBreaker`](crate::CircuitBreaker).
#[derive(Debug, thiserror::Error)]
pub enum BreakerError {
    /// The statistics backend failed. Never caught by the breaker.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A request was denied or failed and no fallback handler is configured.
    #[error("{message}")]
    NoFallbackAvailable {
        message: String,
        #[source]
        source: Option<CallError>,
    },
}

impl BreakerError {
    pub fn is_no_fallback(&self) -> bool {
        matches!(self, BreakerError::NoFallbackAvailable { .. })
    }
}
