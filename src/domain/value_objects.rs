//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use serde::{Deserialize, Serialize};

/// Prefix shared by every key a backend writes.
pub const KEY_PREFIX: &str = "php_cb_";

/// Normalized identity of a guarded service.
///
/// Runs of non-alphanumeric characters collapse into a single `_` and the
/// result is lowercased. Two names that normalize identically share the same
/// circuit state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    /// Normalize a raw service name.
    ///
    /// # Examples
    /// ```
    /// use circuit_breaker::ServiceName;
    ///
    /// assert_eq!(ServiceName::new("Payments API").as_str(), "payments_api");
    /// assert_eq!(ServiceName::new("billing--v2").as_str(), "billing_v2");
    /// ```
    pub fn new(raw: &str) -> Self {
        let mut normalized = String::with_capacity(raw.len());
        let mut in_separator = false;

        for c in raw.chars() {
            if c.is_ascii_alphanumeric() {
                normalized.push(c.to_ascii_lowercase());
                in_separator = false;
            } else if !in_separator {
                normalized.push('_');
                in_separator = true;
            }
        }

        Self(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Storage key for one metric of this service.
    pub fn key(&self, metric: Metric) -> String {
        format!("{}{}{}", KEY_PREFIX, self.0, metric.suffix())
    }
}

impl std::fmt::Display for ServiceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value persisted per service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Forced-open flag
    IsOpen,
    /// Successful request counter
    SuccessCount,
    /// Failed request counter
    FailureCount,
}

impl Metric {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::IsOpen => "_is_open",
            Self::SuccessCount => "_success_counts",
            Self::FailureCount => "_failure_counts",
        }
    }
}

/// Logical state of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitState {
    /// Normal operation - requests allowed
    Closed,
    /// Circuit tripped - requests diverted to the fallback
    Open,
}

impl Default for CircuitState {
    fn default() -> Self {
        CircuitState::Closed
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
        }
    }
}
