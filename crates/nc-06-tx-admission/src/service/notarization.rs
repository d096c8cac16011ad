//! # Notarization Threshold Pipeline
//!
//! Admission of partial-signature notarization requests, serialized by a
//! submission lock of its own:
//!
//! ```text
//! received ─→ parsed ─→ type-checked ─→ signer-consistent ─┬─→ gated (success, not pooled)
//!                                                          └─→ dedup ─→ validated ─→ pooled
//! ```
//!
//! Relay is not part of admission. `relay_sweep`, driven from the idle path,
//! offers every pooled request whose metadata storage can return. Requests
//! stay pooled after relay; they leave when a superseding transaction is
//! committed.

use notary_telemetry::{metric_inc, ADMISSION_OUTCOMES, NOTARIZATION_RELAYED};
use parking_lot::Mutex;
use shared_types::{signer_index_from_extra, TX_VERSION_NOTARIZATION_REQUEST};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AdmissionConfig;
use crate::domain::{
    expand_output_keys, parse_blob, AdmissionOutcome, GateReason, MalformedReason, ParsedTx,
    Rejected, SignerSlots, SignerViolation, SizeLimits, TxValidator, VerificationContext,
};
use crate::ports::outbound::{
    AdmissionMeta, ChainView, EncodedNotarizationRequest, NotarizationRequestMeta, PoolNamespace,
    PoolView, RelaySink,
};
use crate::service::ingestion::{run_isolated, IngestionGate};

/// Single-flight admission path for notarization requests.
pub struct NotarizationPipeline {
    config: Arc<AdmissionConfig>,
    submission_lock: Mutex<()>,
    gate: Arc<IngestionGate>,
    chain: Arc<dyn ChainView>,
    pool: Arc<dyn PoolView>,
    validator: Arc<TxValidator>,
    relay: Arc<dyn RelaySink>,
}

impl NotarizationPipeline {
    /// Create a pipeline.
    pub fn new(
        config: Arc<AdmissionConfig>,
        gate: Arc<IngestionGate>,
        chain: Arc<dyn ChainView>,
        pool: Arc<dyn PoolView>,
        validator: Arc<TxValidator>,
        relay: Arc<dyn RelaySink>,
    ) -> Self {
        Self {
            config,
            submission_lock: Mutex::new(()),
            gate,
            chain,
            pool,
            validator,
            relay,
        }
    }

    /// Admit one request for the event at `target_height`.
    pub fn submit(&self, blob: &[u8], target_height: u64) -> VerificationContext {
        let _submission = self.submission_lock.lock();

        let ctx = match self.check_request(blob, target_height) {
            Ok((parsed, meta)) => self.admit(parsed, meta, blob),
            Err((tx_id, outcome)) => VerificationContext::new(tx_id, outcome),
        };

        metric_inc!(ADMISSION_OUTCOMES, &[ctx.outcome.label()]);
        if ctx.verification_failed() {
            info!(
                tx_id = %ctx.tx_id_hex(),
                outcome = ctx.outcome.label(),
                "[nc-06] rejected notarization request: {}",
                ctx.outcome
            );
        }
        ctx
    }

    /// Parse, type, signer and gating checks.
    fn check_request(
        &self,
        blob: &[u8],
        target_height: u64,
    ) -> Result<(ParsedTx, NotarizationRequestMeta), Rejected> {
        let parsed = parse_blob(blob, self.config.max_tx_blob_size, self.config.max_tx_version)?;
        let tx_id = Some(parsed.tx_id);
        let fail = |outcome| (tx_id, outcome);

        let version = parsed.tx.version();
        if version != TX_VERSION_NOTARIZATION_REQUEST {
            return Err(fail(AdmissionOutcome::Malformed(
                MalformedReason::WrongPipeline(version),
            )));
        }

        let fields = parsed.tx.notarization().ok_or_else(|| {
            fail(AdmissionOutcome::ConsistencyFailure(
                SignerViolation::MissingFields,
            ))
        })?;
        let signers = SignerSlots::decode(&fields.signers_index, self.config.signer_slots)
            .map_err(|v| fail(AdmissionOutcome::ConsistencyFailure(v)))?;
        let extra_index = signer_index_from_extra(&parsed.tx.prefix.extra).map_err(|e| {
            fail(AdmissionOutcome::Malformed(MalformedReason::Unparseable(
                e.to_string(),
            )))
        })?;
        signers
            .check_consistency(fields.sig_count, extra_index)
            .map_err(|v| fail(AdmissionOutcome::ConsistencyFailure(v)))?;

        let current_height = self.chain.current_height();
        if current_height.saturating_add(1) < target_height {
            debug!(
                "[nc-06] notarization request {} for height {} held (at {})",
                hex::encode(parsed.tx_id),
                target_height,
                current_height
            );
            return Err(fail(AdmissionOutcome::Gated(GateReason::BehindTarget {
                current_height,
                target_height,
            })));
        }

        let meta = NotarizationRequestMeta {
            signers,
            sig_count: fields.sig_count,
            payload_digest: fields.payload_digest,
        };
        Ok((parsed, meta))
    }

    /// Dedup, validate and pool under the ingestion session.
    fn admit(
        &self,
        mut parsed: ParsedTx,
        meta: NotarizationRequestMeta,
        blob: &[u8],
    ) -> VerificationContext {
        let tx_id = parsed.tx_id;
        let done = |outcome| VerificationContext::new(Some(tx_id), outcome);

        let mut session = self.gate.session();

        if self.pool.have(&tx_id) || self.chain.have_tx(&tx_id) {
            return done(AdmissionOutcome::Duplicate);
        }

        let limits = SizeLimits {
            block_size_limit: self.chain.block_size_limit(),
            coinbase_reserved: self.config.coinbase_blob_reserved_size,
        };
        let verdict = run_isolated(|| {
            expand_output_keys(&mut parsed.tx);
            self.validator
                .validate(&parsed.tx, &tx_id, parsed.blob_size, limits, false)
        });
        match verdict {
            Some(Ok(())) => {}
            Some(Err(failure)) => return done(failure.into()),
            None => return done(AdmissionOutcome::TaskFault),
        }

        if let Err(e) = session.store_notarization_meta(&tx_id, &meta) {
            warn!(
                "[nc-06] could not store notarization metadata for {}: {}",
                hex::encode(tx_id),
                e
            );
            return done(AdmissionOutcome::StorageFailure(e));
        }

        let admission = AdmissionMeta {
            tx_id,
            blob_size: parsed.blob_size,
            kept_by_block: false,
            relayed: false,
            namespace: PoolNamespace::Notarization,
        };
        match session.admit(&parsed.tx, blob, &admission) {
            Ok(()) => {
                info!(
                    "[nc-06] notarization request {} pooled ({} of {} slots signed)",
                    hex::encode(tx_id),
                    meta.sig_count,
                    self.config.signer_slots
                );
                done(AdmissionOutcome::Admitted)
            }
            Err(rejection) => done(AdmissionOutcome::PoolRejected(rejection)),
        }
    }

    /// Offer every pooled request with retrievable metadata to the relay.
    ///
    /// Returns the number of requests handed off. Lookup and hand-off
    /// failures skip that request only.
    pub fn relay_sweep(&self) -> usize {
        let mut relayed = 0;
        for tx_id in self.pool.pending_ids(PoolNamespace::Notarization) {
            let meta = match self.chain.notarization_request_meta(&tx_id) {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(
                        "[nc-06] skipping notarization request {}: {}",
                        hex::encode(tx_id),
                        e
                    );
                    continue;
                }
            };
            let Some(blob) = self.pool.get_blob(&tx_id) else {
                debug!("[nc-06] request {} left the pool during sweep", hex::encode(tx_id));
                continue;
            };

            let request = EncodedNotarizationRequest {
                tx_id,
                signers_index: meta.signers.encode(),
                sig_count: meta.sig_count,
                payload_digest: meta.payload_digest,
                blob,
            };
            match self.relay.relay_notarization_request(request) {
                Ok(()) => {
                    relayed += 1;
                    metric_inc!(NOTARIZATION_RELAYED);
                }
                Err(e) => warn!(
                    "[nc-06] relay of notarization request {} failed: {}",
                    hex::encode(tx_id),
                    e
                ),
            }
        }

        if relayed > 0 {
            debug!("[nc-06] relayed {} notarization requests", relayed);
        }
        relayed
    }
}
