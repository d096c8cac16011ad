//! Service layer: wires the domain to the ports.
//!
//! `TxAdmissionService` owns one `IngestionGate` shared by the ingestion
//! coordinator, the notarization pipeline and the found-block orchestrator.
//! Lock order is notarization submission lock, then the gate.

pub mod block_relay;
pub mod ingestion;
pub mod notarization;

pub use block_relay::{FoundBlockOrchestrator, FoundBlockReport};
pub use ingestion::{IngestionCoordinator, IngestionGate, IngestionSession};
pub use notarization::NotarizationPipeline;

use rayon::ThreadPoolBuilder;
use shared_types::Block;
use std::sync::Arc;
use tracing::info;

use crate::config::AdmissionConfig;
use crate::domain::{
    CheckpointGuard, IngestFlags, IngestionReport, RefreshOutcome, RejectionCache, TxValidator,
    VerificationContext,
};
use crate::error::{AdmissionError, FoundBlockError};
use crate::ports::inbound::TxAdmissionApi;
use crate::ports::outbound::{
    ChainCommit, ChainView, CheckpointSource, IntegritySupervisor, MinerControl, PoolAdmit,
    PoolView, ProofVerifier, RelaySink, TimeSource,
};

/// Collaborators the admission core is built from.
pub struct AdmissionDeps {
    /// Storage reads.
    pub chain_view: Arc<dyn ChainView>,
    /// Storage writes, handed to the ingestion gate.
    pub chain_commit: Arc<dyn ChainCommit>,
    /// Pool reads.
    pub pool_view: Arc<dyn PoolView>,
    /// Pool writes, handed to the ingestion gate.
    pub pool_admit: Arc<dyn PoolAdmit>,
    /// RingCT proof verification.
    pub verifier: Arc<dyn ProofVerifier>,
    /// Network relay.
    pub relay: Arc<dyn RelaySink>,
    /// Block production control.
    pub miner: Arc<dyn MinerControl>,
    /// External checkpoints.
    pub checkpoints: Arc<dyn CheckpointSource>,
    /// Clock for the checkpoint guard.
    pub time: Arc<dyn TimeSource>,
    /// Receiver of integrity-fatal conditions.
    pub supervisor: Arc<dyn IntegritySupervisor>,
}

/// What one idle tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleReport {
    /// Checkpoint guard result.
    pub checkpoint: RefreshOutcome,
    /// Notarization requests handed to the relay.
    pub notarization_relayed: usize,
}

/// The admission core.
pub struct TxAdmissionService {
    config: Arc<AdmissionConfig>,
    gate: Arc<IngestionGate>,
    validator: Arc<TxValidator>,
    ingestion: IngestionCoordinator,
    notarization: NotarizationPipeline,
    found_blocks: FoundBlockOrchestrator,
    checkpoints: CheckpointGuard,
}

impl TxAdmissionService {
    /// Validate the configuration, build the worker pool and wire the pipelines.
    pub fn new(config: AdmissionConfig, deps: AdmissionDeps) -> crate::error::Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let workers = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("nc-06-verify-{}", i))
            .build()
            .map_err(|e| AdmissionError::WorkerPool(e.to_string()))?;
        let workers = Arc::new(workers);

        let gate = Arc::new(IngestionGate::new(
            deps.pool_admit,
            deps.pool_view.clone(),
            deps.chain_commit,
        ));
        let validator = Arc::new(TxValidator::new(
            deps.verifier,
            config.rejection_cache_capacity,
        ));

        let ingestion = IngestionCoordinator::new(
            config.clone(),
            workers,
            gate.clone(),
            deps.chain_view.clone(),
            deps.pool_view.clone(),
            validator.clone(),
            deps.relay.clone(),
        );
        let notarization = NotarizationPipeline::new(
            config.clone(),
            gate.clone(),
            deps.chain_view.clone(),
            deps.pool_view.clone(),
            validator.clone(),
            deps.relay.clone(),
        );
        let found_blocks = FoundBlockOrchestrator::new(
            gate.clone(),
            deps.pool_view,
            deps.chain_view,
            deps.miner,
            deps.relay,
        );
        let checkpoints =
            CheckpointGuard::new(&config, deps.checkpoints, deps.time, deps.supervisor);

        info!(
            network = ?config.network,
            workers = config.worker_threads,
            signer_slots = config.signer_slots,
            "[nc-06] admission service ready"
        );

        Ok(Self {
            config,
            gate,
            validator,
            ingestion,
            notarization,
            found_blocks,
            checkpoints,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Batch ingestion pipeline.
    pub fn ingestion(&self) -> &IngestionCoordinator {
        &self.ingestion
    }

    /// Notarization request pipeline.
    pub fn notarization(&self) -> &NotarizationPipeline {
        &self.notarization
    }

    /// The gate serializing pool and storage mutations.
    pub fn gate(&self) -> &Arc<IngestionGate> {
        &self.gate
    }

    /// Recently rejected identities.
    pub fn rejections(&self) -> &RejectionCache {
        self.validator.rejections()
    }

    /// See [`FoundBlockOrchestrator::handle_found_block`].
    pub fn handle_found_block(&self, block: &Block) -> Result<FoundBlockReport, FoundBlockError> {
        self.found_blocks.handle_found_block(block)
    }

    /// Checkpoint refresh, then the notarization relay sweep.
    pub fn on_idle(&self) -> IdleReport {
        IdleReport {
            checkpoint: self.checkpoints.maybe_refresh(),
            notarization_relayed: self.notarization.relay_sweep(),
        }
    }
}

impl TxAdmissionApi for TxAdmissionService {
    fn handle_incoming_txs(&self, blobs: &[Vec<u8>], flags: IngestFlags) -> IngestionReport {
        self.ingestion.ingest(blobs, flags)
    }

    fn handle_notarization_request(&self, blob: &[u8], target_height: u64) -> VerificationContext {
        self.notarization.submit(blob, target_height)
    }

    fn handle_found_block(&self, block: &Block) -> Result<FoundBlockReport, FoundBlockError> {
        self.found_blocks.handle_found_block(block)
    }

    fn on_idle(&self) -> IdleReport {
        TxAdmissionService::on_idle(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkType;
    use crate::error::ConfigError;
    use crate::test_utils::{test_config, TestNode, TxBuilder};

    #[test]
    fn test_invalid_config_rejected() {
        let config = AdmissionConfig {
            signer_slots: 0,
            ..test_config()
        };
        let err = TestNode::try_with_config(config).err().unwrap();
        assert!(matches!(
            err,
            AdmissionError::Config(ConfigError::Invalid {
                field: "signer_slots",
                ..
            })
        ));
    }

    #[test]
    fn test_api_routes_to_pipelines() {
        let node = TestNode::new();
        let api: &dyn TxAdmissionApi = &node.service;

        let report = api.handle_incoming_txs(&[TxBuilder::new(1).blob()], IngestFlags::default());
        assert!(report.all_ok());

        let ctx = api.handle_notarization_request(&TxBuilder::new(2).blob(), 0);
        assert!(ctx.verification_failed());
    }

    #[test]
    fn test_idle_tick_off_mainnet() {
        let node = TestNode::new();
        let report = node.service.on_idle();
        assert_eq!(report.checkpoint, RefreshOutcome::NotMainnet);
        assert_eq!(report.notarization_relayed, 0);
        assert_eq!(node.checkpoints.calls(), 0);
    }

    #[test]
    fn test_idle_tick_refreshes_and_sweeps() {
        let config = AdmissionConfig {
            network: NetworkType::Mainnet,
            signer_slots: 3,
            ..test_config()
        };
        let node = TestNode::with_config(config);
        let request = TxBuilder::notarization_request(1, "-1-105", 1, 5);
        assert!(node
            .service
            .notarization()
            .submit(&request.blob(), 0)
            .added_to_pool());

        let report = node.service.on_idle();
        assert_eq!(report.checkpoint, RefreshOutcome::Refreshed);
        assert_eq!(report.notarization_relayed, 1);

        // Second tick inside the interval only sweeps
        let report = node.service.on_idle();
        assert_eq!(report.checkpoint, RefreshOutcome::NotDue);
        assert_eq!(report.notarization_relayed, 1);
        assert_eq!(node.checkpoints.calls(), 1);
    }

    #[test]
    fn test_rejections_visible_through_service() {
        let node = TestNode::new();
        let bad = TxBuilder::new(1).offsets(vec![]);
        node.service
            .ingestion()
            .ingest(&[bad.blob()], IngestFlags::default());
        assert!(node.service.rejections().was_recently_rejected(&bad.tx_id()));
        assert_eq!(node.service.rejections().len(), 1);
    }
}
