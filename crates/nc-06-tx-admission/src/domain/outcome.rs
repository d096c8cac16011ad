//! # Admission Outcomes
//!
//! Every submitted blob ends in exactly one `AdmissionOutcome`. The classic
//! verification facets (`verification_failed`, `too_large`, ...) are derived
//! views over that single value, so no combination of flags can be left
//! half-set.

use shared_types::{Hash, RctType};
use std::fmt;
use uuid::Uuid;

use crate::ports::outbound::{PoolRejection, StorageError};

/// Why an item was accepted without entering the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateReason {
    /// Fully-signed notarization arrived before the wait height.
    BelowNotarizationWaitHeight { height: u64, wait_height: u64 },
    /// Notarization request for an event the node has not synced to.
    BehindTarget { current_height: u64, target_height: u64 },
}

/// Blob-level rejection in the pre-phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// Blob exceeds the configured maximum.
    TooLarge { size: usize, max: usize },
    /// Blob does not decode to a transaction.
    Unparseable(String),
    /// Version is zero or newer than this node understands.
    BadVersion(u16),
    /// Version belongs to the other admission path.
    WrongPipeline(u16),
}

/// Semantic check failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticViolation {
    /// Input list is empty.
    NoInputs,
    /// Input at this position is neither coinbase nor keyed.
    UnsupportedInput(usize),
    /// Output at this position has an unsupported or degenerate target.
    InvalidOutput(usize),
    /// RingCT commitments do not pair one-to-one with outputs.
    CommitmentCountMismatch { commitments: usize, outputs: usize },
    /// Input or output amounts overflow.
    AmountOverflow,
    /// Blob leaves no room for the coinbase under the block size limit.
    TooLarge { size: usize, limit: usize },
    /// Two inputs spend the same key image.
    DuplicateKeyImage,
    /// Input at this position has an empty ring.
    EmptyRing(usize),
    /// Input at this position repeats a ring member or has a zero offset.
    MalformedRing(usize),
    /// Key image is not a curve point or has a torsion component.
    KeyImageOutsideSubgroup,
}

/// Proof-level failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoViolation {
    /// The proof verifier rejected the bundle.
    ProofRejected(RctType),
    /// Bundle type tag is not known.
    UnknownRctType(u8),
    /// Null bundle on a transaction that is not a coinbase.
    NullBundleOnNonCoinbase,
}

/// Notarization signer-slot inconsistency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerViolation {
    /// Request carries no notarization fields.
    MissingFields,
    /// Text is not exactly `expected` characters.
    BadLength { expected: usize, actual: usize },
    /// A slot holds something other than "-1" or "00".."63".
    BadToken { slot: usize, token: String },
    /// Asserted signature count differs from the non-absent slot count.
    CountMismatch { asserted: u8, present: usize },
    /// No slot is filled.
    NoSigners,
    /// A signer index appears in two slots.
    RepeatedSigner(u8),
    /// Extra field carries no signer index.
    MissingExtraIndex,
    /// Extra-field signer index differs from the claimed slot.
    ExtraIndexMismatch { extra: u8, slot: u8 },
}

/// Final result for one submitted blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// Passed every check and entered the pool.
    Admitted,
    /// Already pooled, committed, or repeated earlier in the batch.
    Duplicate,
    /// Valid but held back; not an error.
    Gated(GateReason),
    /// Rejected before parsing completed.
    Malformed(MalformedReason),
    /// Failed a semantic check.
    SemanticFailure(SemanticViolation),
    /// Failed proof verification.
    CryptoFailure(CryptoViolation),
    /// Notarization signer data is inconsistent.
    ConsistencyFailure(SignerViolation),
    /// Pool refused the transaction.
    PoolRejected(PoolRejection),
    /// Storage could not record the transaction.
    StorageFailure(StorageError),
    /// The verification task panicked.
    TaskFault,
}

impl AdmissionOutcome {
    /// Successful outcomes: admitted, already known, or gated.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            AdmissionOutcome::Admitted | AdmissionOutcome::Duplicate | AdmissionOutcome::Gated(_)
        )
    }

    /// Stable label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            AdmissionOutcome::Admitted => "admitted",
            AdmissionOutcome::Duplicate => "duplicate",
            AdmissionOutcome::Gated(_) => "gated",
            AdmissionOutcome::Malformed(_) => "malformed",
            AdmissionOutcome::SemanticFailure(_) => "semantic",
            AdmissionOutcome::CryptoFailure(_) => "crypto",
            AdmissionOutcome::ConsistencyFailure(_) => "consistency",
            AdmissionOutcome::PoolRejected(_) => "pool",
            AdmissionOutcome::StorageFailure(_) => "storage",
            AdmissionOutcome::TaskFault => "fault",
        }
    }
}

impl fmt::Display for AdmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdmissionOutcome::Admitted => write!(f, "admitted"),
            AdmissionOutcome::Duplicate => write!(f, "already have"),
            AdmissionOutcome::Gated(reason) => write!(f, "gated: {:?}", reason),
            AdmissionOutcome::Malformed(reason) => write!(f, "malformed: {:?}", reason),
            AdmissionOutcome::SemanticFailure(v) => write!(f, "semantic failure: {:?}", v),
            AdmissionOutcome::CryptoFailure(v) => write!(f, "crypto failure: {:?}", v),
            AdmissionOutcome::ConsistencyFailure(v) => write!(f, "signer mismatch: {:?}", v),
            AdmissionOutcome::PoolRejected(r) => write!(f, "pool rejected: {}", r),
            AdmissionOutcome::StorageFailure(e) => write!(f, "storage failure: {}", e),
            AdmissionOutcome::TaskFault => write!(f, "verification task panicked"),
        }
    }
}

/// Per-transaction result record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationContext {
    /// Prefix identity, when the blob parsed far enough to compute it.
    pub tx_id: Option<Hash>,
    /// Final outcome.
    pub outcome: AdmissionOutcome,
}

impl VerificationContext {
    /// Create a context.
    pub fn new(tx_id: Option<Hash>, outcome: AdmissionOutcome) -> Self {
        Self { tx_id, outcome }
    }

    /// Any failure facet is set.
    pub fn verification_failed(&self) -> bool {
        !self.outcome.is_success()
    }

    /// Rejected for size, either blob-level or block-space.
    pub fn too_large(&self) -> bool {
        matches!(
            self.outcome,
            AdmissionOutcome::Malformed(MalformedReason::TooLarge { .. })
                | AdmissionOutcome::SemanticFailure(SemanticViolation::TooLarge { .. })
        )
    }

    /// Could not be verified against storage at this time.
    pub fn verification_impossible(&self) -> bool {
        matches!(self.outcome, AdmissionOutcome::StorageFailure(_))
    }

    /// Entered the pool during this call.
    pub fn added_to_pool(&self) -> bool {
        matches!(self.outcome, AdmissionOutcome::Admitted)
    }

    /// Identity as lowercase hex, or "-" when unknown.
    pub fn tx_id_hex(&self) -> String {
        self.tx_id.map(hex::encode).unwrap_or_else(|| "-".to_string())
    }
}

/// Flags accompanying an ingestion batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestFlags {
    /// Blobs come from a block being applied; skips the size check and relay.
    pub is_from_block: bool,
    /// Blobs were relayed to us by a peer.
    pub was_relayed: bool,
    /// Do not relay admitted blobs.
    pub suppress_relay: bool,
}

/// Result of one ingestion batch.
#[derive(Debug, Clone)]
pub struct IngestionReport {
    /// Log correlation id.
    pub batch_id: Uuid,
    /// One context per submitted blob, in submission order.
    pub contexts: Vec<VerificationContext>,
}

impl IngestionReport {
    /// Logical AND over every item's success.
    pub fn all_ok(&self) -> bool {
        self.contexts.iter().all(|c| !c.verification_failed())
    }

    /// Number of items that entered the pool.
    pub fn admitted(&self) -> usize {
        self.contexts.iter().filter(|c| c.added_to_pool()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_outcomes() {
        assert!(AdmissionOutcome::Admitted.is_success());
        assert!(AdmissionOutcome::Duplicate.is_success());
        assert!(AdmissionOutcome::Gated(GateReason::BehindTarget {
            current_height: 1,
            target_height: 5
        })
        .is_success());
        assert!(!AdmissionOutcome::TaskFault.is_success());
    }

    #[test]
    fn test_facets_follow_outcome() {
        let ctx = VerificationContext::new(
            Some([1; 32]),
            AdmissionOutcome::SemanticFailure(SemanticViolation::TooLarge {
                size: 10,
                limit: 5,
            }),
        );
        assert!(ctx.verification_failed());
        assert!(ctx.too_large());
        assert!(!ctx.added_to_pool());

        let ctx = VerificationContext::new(
            None,
            AdmissionOutcome::StorageFailure(StorageError::Unavailable("down".into())),
        );
        assert!(ctx.verification_impossible());
        assert_eq!(ctx.tx_id_hex(), "-");

        let ctx = VerificationContext::new(Some([0xab; 32]), AdmissionOutcome::Admitted);
        assert!(ctx.added_to_pool());
        assert!(!ctx.verification_failed());
        assert!(ctx.tx_id_hex().starts_with("abab"));
    }

    #[test]
    fn test_report_aggregate() {
        let report = IngestionReport {
            batch_id: Uuid::new_v4(),
            contexts: vec![
                VerificationContext::new(None, AdmissionOutcome::Duplicate),
                VerificationContext::new(None, AdmissionOutcome::Admitted),
            ],
        };
        assert!(report.all_ok());
        assert_eq!(report.admitted(), 1);

        let empty = IngestionReport {
            batch_id: Uuid::new_v4(),
            contexts: vec![],
        };
        assert!(empty.all_ok());
    }

    #[test]
    fn test_labels_are_distinct() {
        let labels = [
            AdmissionOutcome::Admitted.label(),
            AdmissionOutcome::Duplicate.label(),
            AdmissionOutcome::TaskFault.label(),
            AdmissionOutcome::CryptoFailure(CryptoViolation::UnknownRctType(9)).label(),
        ];
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), labels.len());
    }
}
