//! # Herb Telemetry
//!
//! Structured logging and Prometheus metrics for the Herb-Chain node.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use herb_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `HC_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `HC_JSON_LOGS` | `false` (`true` in containers) | JSON log output |
//! | `HC_METRICS` | `true` | Register Prometheus metrics |
//! | `HC_SERVICE_NAME` | `herb-node` | Service name |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{env_filter, init_logging};
pub use metrics::{
    gather_metrics, register_metrics, BATCHES_CREATED, CLAIMS, CLAIM_CONFLICTS, EVENTS_OBSERVED,
    LEDGER_FACTS, STATUS_TRANSITIONS, VERIFICATIONS, VERIFICATION_MISMATCHES,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize metrics and logging.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    if config.metrics_enabled {
        register_metrics()?;
    }
    init_logging(&config)?;

    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry...");
    }
}
