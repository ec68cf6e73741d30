//! Domain Layer
//!
//! Circuit state, its storage contract, and the metrics derived from it.
//! Nothing here knows about a concrete backend.

pub mod errors;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use errors::{BreakerError, CallError, CallTimedOut, StoreError};
pub use value_objects::{CircuitState, Metric, ServiceName, KEY_PREFIX};
