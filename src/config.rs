use serde::Deserialize;
use std::time::Duration;

/// Decision thresholds for one circuit breaker.
///
/// Deserializes from a partial mapping; missing keys keep their defaults.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BreakerConfig {
    /// Reserved switch. Exposed, but the decision algorithm does not read it.
    pub enabled: bool,
    /// Minimum recorded requests before the error rate is considered
    pub request_count_threshold: u64,
    /// Error percentage at or above which the circuit opens
    pub allowed_error_percentage: f64,
    /// Optional upper bound on a guarded call, in milliseconds
    pub call_timeout_ms: Option<u64>,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            request_count_threshold: 2,
            allowed_error_percentage: 50.0,
            call_timeout_ms: None,
        }
    }
}

impl BreakerConfig {
    /// Merge a JSON mapping over the defaults.
    ///
    /// # Examples
    /// ```
    /// use circuit_breaker::BreakerConfig;
    ///
    /// let cfg = BreakerConfig::from_json(serde_json::json!({ "requestCountThreshold": 5 })).unwrap();
    /// assert_eq!(cfg.request_count_threshold, 5);
    /// assert_eq!(cfg.allowed_error_percentage, 50.0);
    /// ```
    pub fn from_json(value: serde_json::Value) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_value(value).map_err(|e| ConfigError::InvalidBreakerConfig(e.to_string()))?;
        if !is_valid_percentage(config.allowed_error_percentage) {
            return Err(ConfigError::InvalidBreakerConfig(format!(
                "allowedErrorPercentage must be between 0 and 100, got {}",
                config.allowed_error_percentage
            )));
        }
        Ok(config)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}

/// NaN would make every error rate compare as "at or above" the limit.
fn is_valid_percentage(p: f64) -> bool {
    p.is_finite() && (0.0..=100.0).contains(&p)
}

/// Which statistics backend the binary wires up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Sqlite,
    Redis,
}

impl std::str::FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            "redis" => Ok(Self::Redis),
            other => Err(ConfigError::UnknownStore(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub breaker: BreakerConfig,
    pub store: StoreKind,
    pub sqlite_path: String,
    pub redis_url: String,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            breaker: BreakerConfig::default(),
            store: StoreKind::Sqlite,
            sqlite_path: "circuit_breaker.db".to_string(),
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            debug: false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown statistics store {0:?} (expected memory, sqlite or redis)")]
    UnknownStore(String),
    #[error("invalid breaker configuration: {0}")]
    InvalidBreakerConfig(String),
}

/// Load configuration from the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(|key| std::env::var(key).ok())
}

/// Load configuration through an arbitrary variable lookup.
pub fn load_config_from<F>(var: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();

    let enabled = var("CIRCUIT_BREAKER_ENABLED")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(defaults.breaker.enabled);

    let request_count_threshold = var("CIRCUIT_BREAKER_REQUEST_COUNT_THRESHOLD")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.breaker.request_count_threshold);

    let allowed_error_percentage = var("CIRCUIT_BREAKER_ALLOWED_ERROR_PERCENTAGE")
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|p| is_valid_percentage(*p))
        .unwrap_or(defaults.breaker.allowed_error_percentage);

    let call_timeout_ms = var("CIRCUIT_BREAKER_CALL_TIMEOUT_MS").and_then(|v| v.parse().ok());

    let store = match var("CIRCUIT_BREAKER_STORE") {
        Some(v) => v.parse::<StoreKind>()?,
        None => defaults.store,
    };

    let sqlite_path = var("CIRCUIT_BREAKER_SQLITE_PATH").unwrap_or(defaults.sqlite_path);

    let redis_url = var("CIRCUIT_BREAKER_REDIS_URL").unwrap_or(defaults.redis_url);

    let debug = var("DEBUG").is_some();

    Ok(Config {
        breaker: BreakerConfig {
            enabled,
            request_count_threshold,
            allowed_error_percentage,
            call_timeout_ms,
        },
        store,
        sqlite_path,
        redis_url,
        debug,
    })
}
