//! Application Layer
//!
//! The circuit breaker decision engine, built on the domain ports.

mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, ExecuteOutcome, FallbackHandler, FallbackReason};
