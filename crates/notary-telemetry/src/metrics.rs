//! Prometheus metrics for Notary-Chain subsystems.
//!
//! All metrics follow the naming convention: `nc_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g. found blocks)
//! - **Histogram**: Distribution of values (e.g. ingestion batch size)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // ADMISSION METRICS (Subsystem 6)
    // =========================================================================

    /// Per-item admission outcomes
    pub static ref ADMISSION_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("nc_admission_outcomes_total", "Per-transaction admission outcomes"),
        &["outcome"]  // admitted/duplicate/gated/malformed/semantic/crypto/consistency/pool/storage/fault
    ).expect("metric creation failed");

    /// Blobs per ingestion batch
    pub static ref INGESTION_BATCH_SIZE: Histogram = Histogram::with_opts(
        HistogramOpts::new("nc_ingestion_batch_size", "Blobs submitted per ingestion batch")
            .buckets(exponential_buckets(1.0, 2.0, 12).unwrap_or_default())
    ).expect("metric creation failed");

    /// Notarization requests offered to the relay
    pub static ref NOTARIZATION_RELAYED: Counter = Counter::new(
        "nc_notarization_requests_relayed_total",
        "Pending notarization requests handed to the network relay"
    ).expect("metric creation failed");

    // =========================================================================
    // BLOCK PRODUCTION METRICS
    // =========================================================================

    /// Locally found blocks by result
    pub static ref FOUND_BLOCKS: CounterVec = CounterVec::new(
        Opts::new("nc_found_blocks_total", "Locally found blocks"),
        &["result"]  // relayed/stale/rejected/error
    ).expect("metric creation failed");

    // =========================================================================
    // CHECKPOINT METRICS
    // =========================================================================

    /// Checkpoint refreshes performed
    pub static ref CHECKPOINT_REFRESHES: Counter = Counter::new(
        "nc_checkpoint_refreshes_total",
        "External checkpoint refreshes performed"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; already-registered collectors are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ADMISSION_OUTCOMES.clone()),
        Box::new(INGESTION_BATCH_SIZE.clone()),
        Box::new(NOTARIZATION_RELAYED.clone()),
        Box::new(FOUND_BLOCKS.clone()),
        Box::new(CHECKPOINT_REFRESHES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
