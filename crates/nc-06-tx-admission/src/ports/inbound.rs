//! Inbound (Driving) port for the admission subsystem.

use shared_types::Block;

use crate::domain::{IngestFlags, IngestionReport, VerificationContext};
use crate::error::FoundBlockError;
use crate::service::{FoundBlockReport, IdleReport};

/// Primary admission API.
///
/// Implemented by `TxAdmissionService`. Every method is synchronous and
/// may block on the ingestion lock.
pub trait TxAdmissionApi: Send + Sync {
    /// Two-phase ingestion of a batch of transaction blobs.
    ///
    /// Returns one context per blob, in submission order.
    fn handle_incoming_txs(&self, blobs: &[Vec<u8>], flags: IngestFlags) -> IngestionReport;

    /// Admit one notarization request.
    ///
    /// `target_height` is the height the notarized event belongs to.
    fn handle_notarization_request(&self, blob: &[u8], target_height: u64)
        -> VerificationContext;

    /// Commit and relay a block found by the local miner.
    fn handle_found_block(&self, block: &Block) -> Result<FoundBlockReport, FoundBlockError>;

    /// Periodic housekeeping: checkpoint refresh and notarization relay sweep.
    fn on_idle(&self) -> IdleReport;
}
