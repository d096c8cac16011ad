//! # Semantic & Cryptographic Validator
//!
//! Ordered, short-circuiting checks over one parsed transaction. The order
//! only affects which violation is reported, never whether the transaction
//! passes.
//!
//! | # | Check | Violation |
//! |---|-------|-----------|
//! | 1 | at least one input | `NoInputs` |
//! | 2 | inputs are coinbase or keyed | `UnsupportedInput` |
//! | 3 | output keys are curve points | `InvalidOutput` |
//! | 4 | one commitment per output | `CommitmentCountMismatch` |
//! | 5 | amount sums fit in `u64` | `AmountOverflow` |
//! | 6 | room under block limit (pool only) | `TooLarge` |
//! | 7 | key images distinct | `DuplicateKeyImage` |
//! | 8 | ring offsets well-formed | `EmptyRing` / `MalformedRing` |
//! | 9 | key images in prime-order subgroup | `KeyImageOutsideSubgroup` |
//! | 10 | RingCT proofs | `CryptoViolation` |

use shared_crypto::{check_key_image, is_valid_point, KeyImageCheck};
use shared_types::{Hash, RctType, Transaction, TxIn, TxOutTarget};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::domain::outcome::{AdmissionOutcome, CryptoViolation, SemanticViolation};
use crate::domain::rejection_cache::RejectionCache;
use crate::ports::outbound::ProofVerifier;

/// Validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// Checks 1-9.
    Semantic(SemanticViolation),
    /// Check 10.
    Crypto(CryptoViolation),
}

impl From<ValidationFailure> for AdmissionOutcome {
    fn from(failure: ValidationFailure) -> Self {
        match failure {
            ValidationFailure::Semantic(v) => AdmissionOutcome::SemanticFailure(v),
            ValidationFailure::Crypto(v) => AdmissionOutcome::CryptoFailure(v),
        }
    }
}

/// Block-space parameters for check 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    /// Current cumulative block size limit.
    pub block_size_limit: usize,
    /// Space reserved for the coinbase.
    pub coinbase_reserved: usize,
}

impl SizeLimits {
    /// Largest blob a pool transaction may have.
    pub fn max_pool_blob(&self) -> usize {
        self.block_size_limit.saturating_sub(self.coinbase_reserved)
    }
}

/// Runs the checks and remembers failures.
pub struct TxValidator {
    verifier: Arc<dyn ProofVerifier>,
    rejections: RejectionCache,
}

impl TxValidator {
    /// Create a validator with a rejection cache of `cache_capacity` per generation.
    pub fn new(verifier: Arc<dyn ProofVerifier>, cache_capacity: usize) -> Self {
        Self {
            verifier,
            rejections: RejectionCache::new(cache_capacity),
        }
    }

    /// Validate and record the identity on failure.
    ///
    /// Output keys must already be expanded into the RingCT bundle.
    pub fn validate(
        &self,
        tx: &Transaction,
        tx_id: &Hash,
        blob_size: usize,
        limits: SizeLimits,
        kept_by_block: bool,
    ) -> Result<(), ValidationFailure> {
        let result = check_semantics(tx, blob_size, limits, kept_by_block)
            .map_err(ValidationFailure::Semantic)
            .and_then(|()| {
                check_proofs(tx, self.verifier.as_ref()).map_err(ValidationFailure::Crypto)
            });

        if let Err(failure) = &result {
            debug!(
                "[nc-06] tx {} failed validation: {:?}",
                hex::encode(tx_id),
                failure
            );
            self.rejections.record(*tx_id);
        }
        result
    }

    /// Recently rejected identities.
    pub fn rejections(&self) -> &RejectionCache {
        &self.rejections
    }
}

/// Checks 1-9.
pub fn check_semantics(
    tx: &Transaction,
    blob_size: usize,
    limits: SizeLimits,
    kept_by_block: bool,
) -> Result<(), SemanticViolation> {
    let inputs = &tx.prefix.inputs;
    let outputs = &tx.prefix.outputs;

    if inputs.is_empty() {
        return Err(SemanticViolation::NoInputs);
    }

    if let Some(pos) = inputs
        .iter()
        .position(|input| !matches!(input, TxIn::Gen { .. } | TxIn::ToKey { .. }))
    {
        return Err(SemanticViolation::UnsupportedInput(pos));
    }

    for (pos, out) in outputs.iter().enumerate() {
        match &out.target {
            TxOutTarget::ToKey { key } if is_valid_point(key) => {}
            _ => return Err(SemanticViolation::InvalidOutput(pos)),
        }
    }

    if let Some(rct) = &tx.rct {
        if rct.out_pk.len() != outputs.len() {
            return Err(SemanticViolation::CommitmentCountMismatch {
                commitments: rct.out_pk.len(),
                outputs: outputs.len(),
            });
        }
    }

    checked_sum(inputs.iter().map(TxIn::amount)).ok_or(SemanticViolation::AmountOverflow)?;
    checked_sum(outputs.iter().map(|out| out.amount)).ok_or(SemanticViolation::AmountOverflow)?;

    if !kept_by_block && blob_size > limits.max_pool_blob() {
        return Err(SemanticViolation::TooLarge {
            size: blob_size,
            limit: limits.max_pool_blob(),
        });
    }

    let mut images = HashSet::with_capacity(inputs.len());
    if !tx.key_images().all(|image| images.insert(image)) {
        return Err(SemanticViolation::DuplicateKeyImage);
    }

    for (pos, input) in inputs.iter().enumerate() {
        if let TxIn::ToKey { key_offsets, .. } = input {
            check_ring(pos, key_offsets)?;
        }
    }

    if tx
        .key_images()
        .any(|image| check_key_image(image) != KeyImageCheck::Valid)
    {
        return Err(SemanticViolation::KeyImageOutsideSubgroup);
    }

    Ok(())
}

fn checked_sum(mut amounts: impl Iterator<Item = u64>) -> Option<u64> {
    amounts.try_fold(0u64, u64::checked_add)
}

/// Offsets after the first must be nonzero and pairwise distinct.
fn check_ring(pos: usize, offsets: &[u64]) -> Result<(), SemanticViolation> {
    let Some((_, rest)) = offsets.split_first() else {
        return Err(SemanticViolation::EmptyRing(pos));
    };
    let mut seen = HashSet::with_capacity(rest.len());
    for offset in rest {
        if *offset == 0 || !seen.insert(*offset) {
            return Err(SemanticViolation::MalformedRing(pos));
        }
    }
    Ok(())
}

/// Check 10: dispatch the bundle to its verification routine.
pub fn check_proofs(tx: &Transaction, verifier: &dyn ProofVerifier) -> Result<(), CryptoViolation> {
    let Some(rct) = &tx.rct else {
        return Ok(());
    };

    let kind = rct.kind().map_err(CryptoViolation::UnknownRctType)?;
    let verified = match kind {
        RctType::Null if tx.is_coinbase() => true,
        RctType::Null => return Err(CryptoViolation::NullBundleOnNonCoinbase),
        RctType::Full => verifier.verify_full(rct, true),
        RctType::Simple => verifier.verify_simple(rct, true),
        RctType::Bulletproof => verifier.verify_bulletproof(rct, true),
    };

    if verified {
        Ok(())
    } else {
        Err(CryptoViolation::ProofRejected(kind))
    }
}
