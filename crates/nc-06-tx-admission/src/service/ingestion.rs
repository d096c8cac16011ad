//! # Two-Phase Ingestion
//!
//! ```text
//!            ┌──────── IngestionSession held for the whole batch ────────┐
//! blobs ──→  pre-phase  ──→  dedup  ──→  post-phase  ──→  commit  ──→  contexts
//!           (parallel)    (sequential)   (parallel)     (sequential)
//!           size/parse/   pool+chain+    expand keys,   note in block,
//!           version       batch ids      validate       wait gate, admit
//! ```
//!
//! Parallel phases run on a dedicated rayon pool; `collect` and `for_each`
//! are the barriers. A panic inside a task becomes `TaskFault` for that item
//! only. Admitted blobs are relayed after the session is released.

use notary_telemetry::{metric_inc, metric_observe, ADMISSION_OUTCOMES, INGESTION_BATCH_SIZE};
use parking_lot::{Mutex, MutexGuard};
use rayon::prelude::*;
use rayon::ThreadPool;
use shared_types::{
    parse_transaction, Block, Hash, Transaction, TX_VERSION_NOTARIZATION,
    TX_VERSION_NOTARIZATION_REQUEST,
};
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::AdmissionConfig;
use crate::domain::{
    expand_output_keys, parse_blob, superseded_requests, AdmissionOutcome, GateReason,
    IngestFlags, IngestionReport, MalformedReason, ParsedTx, PendingRequest, SizeLimits,
    TxValidator, VerificationContext,
};
use crate::ports::outbound::{
    AdmissionMeta, ChainCommit, ChainView, CommitOutcome, NotarizationRequestMeta, PoolAdmit,
    PoolNamespace, PoolRejection, PoolView, RelaySink, StorageError,
};

// =============================================================================
// INGESTION GATE
// =============================================================================

struct Mutators {
    pool: Arc<dyn PoolAdmit>,
    pool_view: Arc<dyn PoolView>,
    chain: Arc<dyn ChainCommit>,
}

/// Sole owner of the pool and storage write ports.
///
/// Mutations are only reachable through an `IngestionSession`, so at most
/// one batch, notarization admission or block commit mutates at a time.
pub struct IngestionGate {
    mutators: Mutex<Mutators>,
}

impl IngestionGate {
    /// Take ownership of the write ports. The pool view is read under the
    /// session when committed transactions retire pending requests.
    pub fn new(
        pool: Arc<dyn PoolAdmit>,
        pool_view: Arc<dyn PoolView>,
        chain: Arc<dyn ChainCommit>,
    ) -> Self {
        Self {
            mutators: Mutex::new(Mutators {
                pool,
                pool_view,
                chain,
            }),
        }
    }

    /// Block until the gate is free and open a session.
    pub fn session(&self) -> IngestionSession<'_> {
        IngestionSession {
            guard: self.mutators.lock(),
        }
    }
}

/// Exclusive access to pool and storage mutations. Released on drop.
pub struct IngestionSession<'a> {
    guard: MutexGuard<'a, Mutators>,
}

impl IngestionSession<'_> {
    /// Add a verified transaction to the pool.
    pub fn admit(
        &mut self,
        tx: &Transaction,
        blob: &[u8],
        meta: &AdmissionMeta,
    ) -> Result<(), PoolRejection> {
        self.guard.pool.admit(tx, blob, meta)
    }

    /// Tell storage a transaction appeared in a block being applied.
    pub fn note_tx_in_block(&mut self, tx_id: &Hash, blob: &[u8]) -> Result<(), StorageError> {
        self.guard.chain.note_tx_in_block(tx_id, blob)
    }

    /// Persist metadata for a notarization request about to be admitted.
    pub fn store_notarization_meta(
        &mut self,
        tx_id: &Hash,
        meta: &NotarizationRequestMeta,
    ) -> Result<(), StorageError> {
        self.guard.chain.store_notarization_meta(tx_id, meta)
    }

    /// Commit a block. On main-chain acceptance its transactions leave the
    /// pool, along with the notarization requests they supersede.
    pub fn commit_block(
        &mut self,
        block: &Block,
        tx_blobs: &[Vec<u8>],
    ) -> Result<CommitOutcome, StorageError> {
        let outcome = self.guard.chain.commit_block(block, tx_blobs)?;
        if outcome.accepted_to_main_chain {
            self.guard.pool.remove(&block.tx_hashes);
            for blob in tx_blobs {
                if let Ok(tx) = parse_transaction(blob) {
                    self.retire_superseded(&tx);
                }
            }
        }
        Ok(outcome)
    }

    /// Drop pooled notarization requests made obsolete by `committed`.
    ///
    /// Only fully signed notarizations supersede. Returns the retired ids.
    pub fn retire_superseded(&mut self, committed: &Transaction) -> Vec<Hash> {
        let Some(fields) = committed
            .notarization()
            .filter(|_| committed.version() == TX_VERSION_NOTARIZATION)
        else {
            return Vec::new();
        };

        let view = &self.guard.pool_view;
        let pending: Vec<PendingRequest> = view
            .pending_ids(PoolNamespace::Notarization)
            .iter()
            .filter_map(|tx_id| view.get_blob(tx_id))
            .filter_map(|blob| PendingRequest::from_blob(&blob))
            .collect();

        let retired = superseded_requests(fields, &pending);
        if !retired.is_empty() {
            self.guard.pool.remove(&retired);
            info!(
                "[nc-06] retired {} superseded notarization requests for payload {}",
                retired.len(),
                hex::encode(fields.payload_digest)
            );
        }
        retired
    }
}

// =============================================================================
// TASK ISOLATION
// =============================================================================

/// Run `task`, turning a panic into `None`.
pub(crate) fn run_isolated<T>(task: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(task)) {
        Ok(value) => Some(value),
        Err(_) => {
            error!("[nc-06] verification task panicked; item marked as faulted");
            None
        }
    }
}

/// Pool namespace for a transaction version.
pub(crate) fn namespace_for(version: u16) -> PoolNamespace {
    if version == TX_VERSION_NOTARIZATION_REQUEST {
        PoolNamespace::Notarization
    } else {
        PoolNamespace::Ordinary
    }
}

// =============================================================================
// COORDINATOR
// =============================================================================

struct BatchItem {
    tx_id: Option<Hash>,
    parsed: Option<ParsedTx>,
    /// `None` while the item is still moving through the pipeline.
    outcome: Option<AdmissionOutcome>,
}

impl BatchItem {
    fn in_flight(parsed: ParsedTx) -> Self {
        Self {
            tx_id: Some(parsed.tx_id),
            parsed: Some(parsed),
            outcome: None,
        }
    }

    fn finished(tx_id: Option<Hash>, outcome: AdmissionOutcome) -> Self {
        Self {
            tx_id,
            parsed: None,
            outcome: Some(outcome),
        }
    }

    fn is_in_flight(&self) -> bool {
        self.outcome.is_none()
    }

    fn into_context(self) -> VerificationContext {
        VerificationContext::new(self.tx_id, self.outcome.unwrap_or(AdmissionOutcome::TaskFault))
    }
}

/// Fans batches of blobs through parse, dedup, verify and commit.
pub struct IngestionCoordinator {
    config: Arc<AdmissionConfig>,
    workers: Arc<ThreadPool>,
    gate: Arc<IngestionGate>,
    chain: Arc<dyn ChainView>,
    pool: Arc<dyn PoolView>,
    validator: Arc<TxValidator>,
    relay: Arc<dyn RelaySink>,
}

impl IngestionCoordinator {
    /// Create a coordinator.
    pub fn new(
        config: Arc<AdmissionConfig>,
        workers: Arc<ThreadPool>,
        gate: Arc<IngestionGate>,
        chain: Arc<dyn ChainView>,
        pool: Arc<dyn PoolView>,
        validator: Arc<TxValidator>,
        relay: Arc<dyn RelaySink>,
    ) -> Self {
        Self {
            config,
            workers,
            gate,
            chain,
            pool,
            validator,
            relay,
        }
    }

    /// Ingest a batch. Never fails as a whole; see each context.
    pub fn ingest(&self, blobs: &[Vec<u8>], flags: IngestFlags) -> IngestionReport {
        let batch_id = Uuid::new_v4();
        metric_observe!(INGESTION_BATCH_SIZE, blobs.len() as f64);
        debug!(
            batch = %batch_id,
            size = blobs.len(),
            from_block = flags.is_from_block,
            "[nc-06] ingesting batch"
        );

        let mut session = self.gate.session();

        let mut items: Vec<BatchItem> = self.workers.install(|| {
            blobs
                .par_iter()
                .map(|blob| {
                    run_isolated(|| self.pre_phase(blob))
                        .unwrap_or_else(|| BatchItem::finished(None, AdmissionOutcome::TaskFault))
                })
                .collect()
        });

        self.mark_known(&mut items, blobs, flags, &mut session);

        let limits = SizeLimits {
            block_size_limit: self.chain.block_size_limit(),
            coinbase_reserved: self.config.coinbase_blob_reserved_size,
        };
        self.workers.install(|| {
            items
                .par_iter_mut()
                .filter(|item| item.is_in_flight())
                .for_each(|item| {
                    let verdict = run_isolated(|| self.post_phase(item, limits, flags));
                    match verdict {
                        Some(Ok(())) => {}
                        Some(Err(outcome)) => item.outcome = Some(outcome),
                        None => item.outcome = Some(AdmissionOutcome::TaskFault),
                    }
                });
        });

        self.commit(&mut items, blobs, flags, &mut session);
        drop(session);

        let contexts: Vec<VerificationContext> =
            items.into_iter().map(BatchItem::into_context).collect();

        if !flags.is_from_block && !flags.suppress_relay {
            self.relay_admitted(&contexts, blobs, batch_id);
        }

        for ctx in &contexts {
            metric_inc!(ADMISSION_OUTCOMES, &[ctx.outcome.label()]);
            if ctx.verification_failed() {
                notary_telemetry::log_tx_event!(
                    info,
                    "06",
                    "[nc-06] rejected transaction",
                    ctx.tx_id_hex(),
                    batch = %batch_id,
                    outcome = ctx.outcome.label(),
                    reason = %ctx.outcome
                );
            }
        }

        let report = IngestionReport { batch_id, contexts };
        debug!(
            batch = %batch_id,
            admitted = report.admitted(),
            all_ok = report.all_ok(),
            "[nc-06] batch complete"
        );
        report
    }

    /// Parse, size and version checks. Notarization requests belong to the
    /// notarization pipeline.
    fn pre_phase(&self, blob: &[u8]) -> BatchItem {
        match parse_blob(blob, self.config.max_tx_blob_size, self.config.max_tx_version) {
            Ok(parsed) if parsed.tx.version() == TX_VERSION_NOTARIZATION_REQUEST => {
                BatchItem::finished(
                    Some(parsed.tx_id),
                    AdmissionOutcome::Malformed(MalformedReason::WrongPipeline(parsed.tx.version())),
                )
            }
            Ok(parsed) => BatchItem::in_flight(parsed),
            Err((tx_id, outcome)) => BatchItem::finished(tx_id, outcome),
        }
    }

    /// Sequential dedup against pool, storage and earlier batch items.
    ///
    /// Known items keep their block side effect: storage still learns they
    /// appeared in the block being applied.
    fn mark_known(
        &self,
        items: &mut [BatchItem],
        blobs: &[Vec<u8>],
        flags: IngestFlags,
        session: &mut IngestionSession<'_>,
    ) {
        let mut seen: HashSet<Hash> = HashSet::with_capacity(items.len());
        for (item, blob) in items.iter_mut().zip(blobs) {
            let Some(tx_id) = item.tx_id.filter(|_| item.is_in_flight()) else {
                continue;
            };
            let known =
                !seen.insert(tx_id) || self.pool.have(&tx_id) || self.chain.have_tx(&tx_id);
            if !known {
                continue;
            }

            let parsed = item.parsed.take();
            item.outcome = Some(AdmissionOutcome::Duplicate);
            if flags.is_from_block {
                match session.note_tx_in_block(&tx_id, blob) {
                    Ok(()) => {
                        if let Some(parsed) = &parsed {
                            session.retire_superseded(&parsed.tx);
                        }
                    }
                    Err(e) => {
                        warn!(
                            "[nc-06] failed to note known tx {} in block: {}",
                            hex::encode(tx_id),
                            e
                        );
                        item.outcome = Some(AdmissionOutcome::StorageFailure(e));
                    }
                }
            }
        }
    }

    /// Expand output keys and run the validator.
    fn post_phase(
        &self,
        item: &mut BatchItem,
        limits: SizeLimits,
        flags: IngestFlags,
    ) -> Result<(), AdmissionOutcome> {
        let parsed = item.parsed.as_mut().ok_or(AdmissionOutcome::TaskFault)?;
        expand_output_keys(&mut parsed.tx);
        self.validator
            .validate(
                &parsed.tx,
                &parsed.tx_id,
                parsed.blob_size,
                limits,
                flags.is_from_block,
            )
            .map_err(AdmissionOutcome::from)
    }

    /// Sequential storage notes, wait gate and pool admission.
    fn commit(
        &self,
        items: &mut [BatchItem],
        blobs: &[Vec<u8>],
        flags: IngestFlags,
        session: &mut IngestionSession<'_>,
    ) {
        let height = self.chain.current_height();
        let wait_height = self.config.notarization_wait_height;

        for (item, blob) in items.iter_mut().zip(blobs) {
            if !item.is_in_flight() {
                continue;
            }
            let Some(parsed) = item.parsed.take() else {
                item.outcome = Some(AdmissionOutcome::TaskFault);
                continue;
            };

            if flags.is_from_block {
                if let Err(e) = session.note_tx_in_block(&parsed.tx_id, blob) {
                    warn!(
                        "[nc-06] failed to note tx {} in block: {}",
                        hex::encode(parsed.tx_id),
                        e
                    );
                    item.outcome = Some(AdmissionOutcome::StorageFailure(e));
                    continue;
                }
                session.retire_superseded(&parsed.tx);
            }

            if parsed.tx.version() == TX_VERSION_NOTARIZATION && height < wait_height {
                debug!(
                    "[nc-06] holding notarization {} until height {} (at {})",
                    hex::encode(parsed.tx_id),
                    wait_height,
                    height
                );
                item.outcome = Some(AdmissionOutcome::Gated(
                    GateReason::BelowNotarizationWaitHeight {
                        height,
                        wait_height,
                    },
                ));
                continue;
            }

            let meta = AdmissionMeta {
                tx_id: parsed.tx_id,
                blob_size: parsed.blob_size,
                kept_by_block: flags.is_from_block,
                relayed: flags.was_relayed,
                namespace: namespace_for(parsed.tx.version()),
            };
            item.outcome = Some(match session.admit(&parsed.tx, blob, &meta) {
                Ok(()) => AdmissionOutcome::Admitted,
                Err(rejection) => AdmissionOutcome::PoolRejected(rejection),
            });
        }
    }

    fn relay_admitted(&self, contexts: &[VerificationContext], blobs: &[Vec<u8>], batch_id: Uuid) {
        let admitted: Vec<Vec<u8>> = contexts
            .iter()
            .zip(blobs)
            .filter(|(ctx, _)| ctx.added_to_pool())
            .map(|(_, blob)| blob.clone())
            .collect();
        if admitted.is_empty() {
            return;
        }

        let count = admitted.len();
        match self.relay.relay_transactions(admitted) {
            Ok(()) => debug!(batch = %batch_id, count, "[nc-06] relayed admitted transactions"),
            Err(e) => warn!(batch = %batch_id, "[nc-06] relay hand-off failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SemanticViolation;
    use crate::test_utils::{key, TestNode, TxBuilder};

    fn ingest(node: &TestNode, blobs: &[Vec<u8>]) -> IngestionReport {
        node.service.ingestion().ingest(blobs, IngestFlags::default())
    }

    #[test]
    fn test_results_preserve_submission_order() {
        let node = TestNode::new();
        let blobs: Vec<Vec<u8>> = (0..16)
            .map(|n| {
                if n % 3 == 0 {
                    vec![0xff; 8]
                } else {
                    TxBuilder::new(n).blob()
                }
            })
            .collect();

        let report = ingest(&node, &blobs);
        assert_eq!(report.contexts.len(), 16);
        for (n, ctx) in report.contexts.iter().enumerate() {
            if n % 3 == 0 {
                assert!(ctx.verification_failed(), "item {} should fail", n);
            } else {
                assert!(ctx.added_to_pool(), "item {} should be admitted", n);
            }
        }
        assert!(!report.all_ok());
    }

    #[test]
    fn test_failed_item_does_not_abort_siblings() {
        let node = TestNode::new();
        let bad = TxBuilder::new(1).key_images(&[key(77), key(77)]).blob();
        let good = TxBuilder::new(2).blob();

        let report = ingest(&node, &[bad, good]);
        assert_eq!(
            report.contexts[0].outcome,
            AdmissionOutcome::SemanticFailure(SemanticViolation::DuplicateKeyImage)
        );
        assert!(report.contexts[1].added_to_pool());
        assert!(!report.all_ok());
    }

    #[test]
    fn test_repeat_in_batch_is_duplicate() {
        let node = TestNode::new();
        let blob = TxBuilder::new(1).blob();

        let report = ingest(&node, &[blob.clone(), blob]);
        assert!(report.contexts[0].added_to_pool());
        assert_eq!(report.contexts[1].outcome, AdmissionOutcome::Duplicate);
        assert!(report.all_ok());
    }

    #[test]
    fn test_resubmission_is_noop() {
        let node = TestNode::new();
        let blob = TxBuilder::new(1).blob();
        assert!(ingest(&node, &[blob.clone()]).all_ok());
        let before = node.pool.len();

        let report = ingest(&node, &[blob]);
        assert_eq!(report.contexts[0].outcome, AdmissionOutcome::Duplicate);
        assert!(report.all_ok());
        assert_eq!(node.pool.len(), before);
    }

    #[test]
    fn test_committed_transaction_is_duplicate() {
        let node = TestNode::new();
        let tx = TxBuilder::new(1).build();
        node.chain.insert_committed(&tx);

        let report = ingest(&node, &[TxBuilder::new(1).blob()]);
        assert_eq!(report.contexts[0].outcome, AdmissionOutcome::Duplicate);
        assert!(node.pool.is_empty());
    }

    #[test]
    fn test_notarization_request_rejected_on_ordinary_path() {
        let node = TestNode::new();
        let blob = TxBuilder::notarization_request(1, "-1-103", 1, 3).blob();
        let report = ingest(&node, &[blob]);
        assert_eq!(
            report.contexts[0].outcome,
            AdmissionOutcome::Malformed(MalformedReason::WrongPipeline(
                TX_VERSION_NOTARIZATION_REQUEST
            ))
        );
    }

    #[test]
    fn test_wait_gated_notarization_not_pooled() {
        let mut config = crate::test_utils::test_config();
        config.notarization_wait_height = 50;
        let node = TestNode::with_config(config);
        node.chain.set_height(10);

        let blob = TxBuilder::new(1).version(TX_VERSION_NOTARIZATION).blob();
        let report = ingest(&node, &[blob.clone()]);
        assert_eq!(
            report.contexts[0].outcome,
            AdmissionOutcome::Gated(GateReason::BelowNotarizationWaitHeight {
                height: 10,
                wait_height: 50
            })
        );
        assert!(report.all_ok());
        assert!(node.pool.is_empty());

        node.chain.set_height(50);
        assert!(ingest(&node, &[blob]).contexts[0].added_to_pool());
    }

    #[test]
    fn test_block_transactions_noted_and_not_relayed() {
        let node = TestNode::new();
        let blob = TxBuilder::new(1).blob();
        let tx_id = TxBuilder::new(1).tx_id();

        let flags = IngestFlags {
            is_from_block: true,
            ..IngestFlags::default()
        };
        let report = node.service.ingestion().ingest(&[blob], flags);

        assert!(report.contexts[0].added_to_pool());
        assert!(node.chain.was_noted_in_block(&tx_id));
        assert!(node.relay_messages().is_empty());
    }

    #[test]
    fn test_known_notarization_in_block_retires_request() {
        let mut config = crate::test_utils::test_config();
        config.signer_slots = 3;
        let node = TestNode::with_config(config);
        let request = TxBuilder::notarization_request(1, "-1-105", 1, 5);
        assert!(node
            .service
            .notarization()
            .submit(&request.blob(), 0)
            .added_to_pool());

        let completed = TxBuilder::completing(2, &request, "03-105", 2);
        assert!(ingest(&node, &[completed.blob()]).contexts[0].added_to_pool());
        assert!(node.pool.have(&request.tx_id()));

        let flags = IngestFlags {
            is_from_block: true,
            ..IngestFlags::default()
        };
        let report = node.service.ingestion().ingest(&[completed.blob()], flags);
        assert_eq!(report.contexts[0].outcome, AdmissionOutcome::Duplicate);
        assert!(node.chain.was_noted_in_block(&completed.tx_id()));
        assert!(!node.pool.have(&request.tx_id()));
        assert_eq!(node.service.notarization().relay_sweep(), 0);
    }

    #[test]
    fn test_session_retires_only_fully_signed_notarizations() {
        let node = TestNode::new();
        let request = TxBuilder::notarization_request(1, "-105", 1, 5);
        let meta = AdmissionMeta {
            tx_id: request.tx_id(),
            blob_size: request.blob().len(),
            kept_by_block: false,
            relayed: false,
            namespace: PoolNamespace::Notarization,
        };
        let mut session = node.service.gate().session();
        session
            .admit(&request.build(), &request.blob(), &meta)
            .unwrap();

        let chained_request = TxBuilder::next_request(2, &request, "-1", 1, 5).build();
        assert!(session.retire_superseded(&chained_request).is_empty());
        assert!(session.retire_superseded(&TxBuilder::new(3).build()).is_empty());

        let completed = TxBuilder::completing(4, &request, "-1", 1).build();
        assert_eq!(session.retire_superseded(&completed), vec![request.tx_id()]);
        drop(session);
        assert!(node.pool.is_empty());
    }

    #[test]
    fn test_storage_failure_while_noting_is_reported() {
        let node = TestNode::new();
        node.chain.fail_storage(true);
        let flags = IngestFlags {
            is_from_block: true,
            ..IngestFlags::default()
        };

        let report = node
            .service
            .ingestion()
            .ingest(&[TxBuilder::new(1).blob()], flags);
        assert!(report.contexts[0].verification_impossible());
        assert!(!report.all_ok());
        assert!(node.pool.is_empty());
    }

    #[test]
    fn test_admitted_transactions_relayed_unless_suppressed() {
        let node = TestNode::new();
        ingest(&node, &[TxBuilder::new(1).blob()]);
        assert_eq!(node.relay_messages().len(), 1);

        let flags = IngestFlags {
            suppress_relay: true,
            ..IngestFlags::default()
        };
        node.service
            .ingestion()
            .ingest(&[TxBuilder::new(2).blob()], flags);
        assert!(node.relay_messages().is_empty());
    }

    #[test]
    fn test_pool_double_spend_rejected() {
        let node = TestNode::new();
        let first = TxBuilder::new(1).key_images(&[key(900)]).blob();
        let second = TxBuilder::new(2).key_images(&[key(900)]).blob();

        let report = ingest(&node, &[first, second]);
        assert!(report.contexts[0].added_to_pool());
        assert_eq!(
            report.contexts[1].outcome,
            AdmissionOutcome::PoolRejected(PoolRejection::KeyImageSpent)
        );
    }

    #[test]
    fn test_run_isolated_catches_panic() {
        assert_eq!(run_isolated(|| 7), Some(7));
        let faulted: Option<()> = run_isolated(|| panic!("boom"));
        assert!(faulted.is_none());
    }

    #[test]
    fn test_session_serializes_access() {
        let node = TestNode::new();
        let gate = node.service.gate();
        let session = gate.session();
        assert!(gate.mutators.try_lock().is_none());
        drop(session);
        assert!(gate.mutators.try_lock().is_some());
    }
}
