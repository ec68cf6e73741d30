//! Operator Command Line
//!
//! Inspects and operates circuits in a shared statistics store. This is
//! where an open circuit gets closed again: the breaker never clears the
//! stored flag by itself.

use crate::application::{CircuitBreaker, ExecuteOutcome, FallbackReason};
use crate::config::BreakerConfig;
use crate::domain::ports::StatisticsStore;
use crate::domain::services::CircuitSnapshot;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpStream;

/// Probe connect timeout when neither the flag nor the configuration sets one.
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Parser)]
#[command(name = "cbctl", version, about = "Inspect and operate circuit breakers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Command {
    /// Print counters, error rate and whether calls would be denied
    Status { service: String },
    /// Force the circuit open
    Open { service: String },
    /// Clear the open flag (counters are kept)
    Close { service: String },
    /// Zero the success and failure counters
    Reset { service: String },
    /// Open a TCP connection to ADDR through the breaker
    Probe {
        service: String,
        addr: String,
        /// Connect timeout in milliseconds, overriding the configured one
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

#[derive(Debug, Serialize)]
struct StatusReport {
    #[serde(flatten)]
    snapshot: CircuitSnapshot,
    allow_request: bool,
}

/// An explicit flag wins over the configured call timeout.
fn probe_timeout_ms(flag: Option<u64>, configured: Option<u64>) -> u64 {
    flag.or(configured).unwrap_or(DEFAULT_PROBE_TIMEOUT_MS)
}

/// Execute one command and return what should be printed.
pub async fn run(
    command: Command,
    store: Arc<dyn StatisticsStore>,
    config: BreakerConfig,
) -> anyhow::Result<String> {
    match command {
        Command::Status { service } => {
            let breaker = CircuitBreaker::new(&service, store, config);
            let snapshot = breaker.statistics().snapshot().await?;
            let report = StatusReport {
                allow_request: !breaker.would_open(&snapshot),
                snapshot,
            };
            Ok(serde_json::to_string_pretty(&report)?)
        }
        Command::Open { service } => {
            let breaker = CircuitBreaker::new(&service, store, config);
            breaker.statistics().toggle_circuit(true).await?;
            tracing::info!("circuit for {} forced open", breaker.service());
            Ok(format!("{}: open", breaker.service()))
        }
        Command::Close { service } => {
            let breaker = CircuitBreaker::new(&service, store, config);
            breaker.statistics().toggle_circuit(false).await?;
            tracing::info!("circuit for {} closed by operator", breaker.service());
            Ok(format!("{}: closed", breaker.service()))
        }
        Command::Reset { service } => {
            let breaker = CircuitBreaker::new(&service, store, config);
            breaker.statistics().reset_request_stats().await?;
            tracing::info!("request stats for {} reset by operator", breaker.service());
            Ok(format!("{}: counters reset", breaker.service()))
        }
        Command::Probe {
            service,
            addr,
            timeout_ms,
        } => {
            let config = BreakerConfig {
                call_timeout_ms: Some(probe_timeout_ms(timeout_ms, config.call_timeout_ms)),
                ..config
            };
            let breaker = CircuitBreaker::new(&service, store, config).with_fallback(|reason| match reason {
                FallbackReason::ShortCircuited => tracing::warn!("probe skipped: circuit is open"),
                FallbackReason::CallFailed(e) => tracing::warn!("probe failed: {}", e),
            });

            let target = addr.clone();
            let outcome = breaker
                .execute(move || async move { TcpStream::connect(target.as_str()).await.map(|_| ()) })
                .await?;

            let result = match outcome {
                ExecuteOutcome::Completed(()) => "reachable",
                ExecuteOutcome::Failed => "unreachable",
                ExecuteOutcome::ShortCircuited => "short-circuited",
            };
            Ok(format!("{} {}: {}", breaker.service(), addr, result))
        }
    }
}
