//! Error types for the admission subsystem.
//!
//! Per-transaction failures are not errors: they are `AdmissionOutcome`
//! variants. The types here cover construction and found-block handling.

use shared_types::CodecError;
use thiserror::Error;

use crate::ports::outbound::StorageError;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Document is not valid JSON for `AdmissionConfig`
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds an unusable value
    #[error("Invalid config field {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Admission subsystem errors
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fan-out worker pool could not be built
    #[error("Worker pool error: {0}")]
    WorkerPool(String),
}

/// Result type for admission operations
pub type Result<T> = std::result::Result<T, AdmissionError>;

/// Failure of a locally found block.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FoundBlockError {
    /// The block references a transaction the pool no longer holds
    #[error("Transaction {0} referenced by the block is not in the pool")]
    MissingPoolTx(String),

    /// Storage refused to put the block on the main chain
    #[error("Block was not accepted onto the main chain")]
    NotAccepted,

    /// Storage failed while committing
    #[error("Storage error during commit: {0}")]
    Storage(#[from] StorageError),

    /// Block could not be encoded for relay
    #[error("Block encoding failed: {0}")]
    Codec(#[from] CodecError),
}
