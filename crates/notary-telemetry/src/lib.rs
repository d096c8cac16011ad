//! # Notary Telemetry
//!
//! Logging and metrics for Notary-Chain subsystems.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` with an env filter and a human or JSON layer
//! - **Metrics**: Prometheus counters and histograms in a crate-wide registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notary_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::for_subsystem("06", "tx-admission");
//! init_telemetry(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `NC_LOG_LEVEL` | `info` | Log level filter |
//! | `NC_JSON_LOGS` | `false` | JSON log lines |
//! | `NC_NETWORK` | `mainnet` | Network name |
//! | `NC_SUBSYSTEM_ID` | `00` | Subsystem identifier |

#![warn(missing_docs)]

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, ADMISSION_OUTCOMES, CHECKPOINT_REFRESHES, FOUND_BLOCKS,
    INGESTION_BATCH_SIZE, NOTARIZATION_RELAYED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A metric could not be registered or encoded.
    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Register metrics, then install the logging subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Convenience macro for recording a metric with a value.
#[macro_export]
macro_rules! metric_observe {
    ($metric:expr, $value:expr) => {
        $metric.observe($value)
    };
}
