//! # Found-Block Orchestration
//!
//! ```text
//! pause ─→ gather pool blobs ─→ [session] commit [/session] ─→ refresh template ─→ resume
//!                 │
//!                 └─ missing pool tx: resume, fail
//!
//! resume ─→ accepted? ─→ refetch from storage ─→ relay
//! ```
//!
//! Mining is back on before the relay work starts. A drop guard covers the
//! exits that happen before the template refresh.
//!
//! The commit goes through the same `IngestionSession` as batch ingestion,
//! so a found block never interleaves with a batch's dedup and commit.
//! Relay uses the transactions storage returns, never the pool's copies; if
//! storage lost any of them to a concurrent reorganization the block is
//! stale and is not relayed.

use notary_telemetry::{metric_inc, FOUND_BLOCKS};
use shared_types::{block_hash, serialize_block, Block, Hash};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::FoundBlockError;
use crate::ports::outbound::{ChainView, MinerControl, PoolView, RelayError, RelaySink};
use crate::service::ingestion::IngestionGate;

/// Result of a found block that reached the main chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoundBlockReport {
    /// Block and transactions handed to the relay.
    Relayed,
    /// Storage no longer holds some of the block's transactions.
    Stale {
        /// Identities storage could not return.
        missing: Vec<Hash>,
    },
    /// Block committed but the relay refused the hand-off.
    RelayFailed(RelayError),
}

impl FoundBlockReport {
    fn label(&self) -> &'static str {
        match self {
            FoundBlockReport::Relayed => "relayed",
            FoundBlockReport::Stale { .. } => "stale",
            FoundBlockReport::RelayFailed(_) => "relay_failed",
        }
    }
}

/// Resumes block production when dropped unless `resume_now` already did.
struct ResumeOnDrop<'a> {
    miner: &'a dyn MinerControl,
    armed: bool,
}

impl<'a> ResumeOnDrop<'a> {
    fn new(miner: &'a dyn MinerControl) -> Self {
        Self { miner, armed: true }
    }

    fn resume_now(mut self) {
        self.armed = false;
        self.miner.resume();
    }
}

impl Drop for ResumeOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.miner.resume();
        }
    }
}

/// Commits and relays blocks found by the local miner.
pub struct FoundBlockOrchestrator {
    gate: Arc<IngestionGate>,
    pool: Arc<dyn PoolView>,
    chain: Arc<dyn ChainView>,
    miner: Arc<dyn MinerControl>,
    relay: Arc<dyn RelaySink>,
}

impl FoundBlockOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        gate: Arc<IngestionGate>,
        pool: Arc<dyn PoolView>,
        chain: Arc<dyn ChainView>,
        miner: Arc<dyn MinerControl>,
        relay: Arc<dyn RelaySink>,
    ) -> Self {
        Self {
            gate,
            pool,
            chain,
            miner,
            relay,
        }
    }

    /// Handle a block found by the local miner.
    pub fn handle_found_block(&self, block: &Block) -> Result<FoundBlockReport, FoundBlockError> {
        let result = self.commit_and_relay(block);
        let label = match &result {
            Ok(report) => report.label(),
            Err(FoundBlockError::NotAccepted) => "rejected",
            Err(_) => "error",
        };
        metric_inc!(FOUND_BLOCKS, &[label]);
        result
    }

    fn commit_and_relay(&self, block: &Block) -> Result<FoundBlockReport, FoundBlockError> {
        let block_id = hex::encode(block_hash(block)?);

        self.miner.pause();
        let resume = ResumeOnDrop::new(&*self.miner);

        let tx_blobs = block
            .tx_hashes
            .iter()
            .map(|tx_id| {
                self.pool
                    .get_blob(tx_id)
                    .ok_or_else(|| FoundBlockError::MissingPoolTx(hex::encode(tx_id)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = {
            let mut session = self.gate.session();
            session.commit_block(block, &tx_blobs)
        };
        self.miner.refresh_template();
        resume.resume_now();
        let outcome = committed?;

        if !outcome.accepted_to_main_chain {
            warn!(
                "[nc-06] found block {} not accepted (conflict: {})",
                block_id, outcome.conflict
            );
            return Err(FoundBlockError::NotAccepted);
        }
        info!(
            "[nc-06] found block {} committed with {} transactions",
            block_id,
            block.tx_hashes.len()
        );

        let fetched = self.chain.fetch_txs(&block.tx_hashes);
        if !fetched.missing.is_empty() {
            warn!(
                "[nc-06] block {} is stale: {} transactions gone from storage, not relaying",
                block_id,
                fetched.missing.len()
            );
            return Ok(FoundBlockReport::Stale {
                missing: fetched.missing,
            });
        }

        let block_blob = serialize_block(block)?;
        let relay_blobs = fetched.found.into_iter().map(|(_, blob)| blob).collect();
        match self.relay.relay_block(block_blob, relay_blobs) {
            Ok(()) => {
                debug!("[nc-06] relayed found block {}", block_id);
                Ok(FoundBlockReport::Relayed)
            }
            Err(e) => {
                warn!("[nc-06] relay of found block {} failed: {}", block_id, e);
                Ok(FoundBlockReport::RelayFailed(e))
            }
        }
    }
}
