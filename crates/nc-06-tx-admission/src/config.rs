//! Admission configuration.
//!
//! Loaded from JSON; every field has a default so partial documents are valid.

use serde::{Deserialize, Serialize};
use shared_types::TX_VERSION_CURRENT;

use crate::error::ConfigError;

/// Which network the node runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Production network. The only one with external checkpoints.
    #[default]
    Mainnet,
    /// Public test network.
    Testnet,
    /// Staging network.
    Stagenet,
    /// Local regression chain.
    Fakechain,
}

/// Tunables for the admission core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Network variant.
    pub network: NetworkType,
    /// Largest blob accepted in the pre-phase, in bytes.
    pub max_tx_blob_size: usize,
    /// Highest transaction version accepted.
    pub max_tx_version: u16,
    /// Block space kept free for the coinbase when sizing pool transactions.
    pub coinbase_blob_reserved_size: usize,
    /// Fully-signed notarizations wait in storage until the chain reaches this height.
    pub notarization_wait_height: u64,
    /// Number of signer slots (M) in a notarization request.
    pub signer_slots: usize,
    /// Fan-out worker threads.
    pub worker_threads: usize,
    /// Identities per rejection-cache generation.
    pub rejection_cache_capacity: usize,
    /// Minimum spacing between checkpoint refreshes.
    pub checkpoint_refresh_interval_secs: u64,
    /// Location handed to the checkpoint source.
    pub checkpoint_path: String,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            network: NetworkType::Mainnet,
            max_tx_blob_size: 1_000_000,
            max_tx_version: TX_VERSION_CURRENT,
            coinbase_blob_reserved_size: 600,
            notarization_wait_height: 0,
            signer_slots: 13,
            worker_threads: num_cpus::get(),
            rejection_cache_capacity: 100,
            checkpoint_refresh_interval_secs: 600,
            checkpoint_path: "checkpoints.json".to_string(),
        }
    }
}

/// Signer indices are encoded in two characters, so they stop at 63.
pub const MAX_SIGNER_SLOTS: usize = 64;

impl AdmissionConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
            ConfigError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        if self.max_tx_blob_size == 0 {
            return Err(invalid("max_tx_blob_size", "must be positive"));
        }
        if self.max_tx_version == 0 || self.max_tx_version > TX_VERSION_CURRENT {
            return Err(invalid(
                "max_tx_version",
                format!("must be in 1..={}", TX_VERSION_CURRENT),
            ));
        }
        if self.signer_slots == 0 || self.signer_slots > MAX_SIGNER_SLOTS {
            return Err(invalid(
                "signer_slots",
                format!("must be in 1..={}", MAX_SIGNER_SLOTS),
            ));
        }
        if self.worker_threads == 0 {
            return Err(invalid("worker_threads", "must be positive"));
        }
        if self.rejection_cache_capacity == 0 {
            return Err(invalid("rejection_cache_capacity", "must be positive"));
        }
        if self.checkpoint_refresh_interval_secs == 0 {
            return Err(invalid("checkpoint_refresh_interval_secs", "must be positive"));
        }
        Ok(())
    }

    /// Refresh interval in milliseconds, the unit of `TimeSource`.
    pub fn checkpoint_refresh_interval_ms(&self) -> u64 {
        self.checkpoint_refresh_interval_secs.saturating_mul(1000)
    }
}
