//! Pre-phase parsing: blob bytes to an identified transaction.

use shared_types::{blob_hash, parse_transaction, tx_prefix_hash, Hash, Transaction};

use crate::domain::outcome::{AdmissionOutcome, MalformedReason};

/// Early exit of a pipeline stage: identity if known, and the final outcome.
pub type Rejected = (Option<Hash>, AdmissionOutcome);

/// A transaction with its identities, computed before any mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTx {
    /// Decoded transaction.
    pub tx: Transaction,
    /// Prefix identity.
    pub tx_id: Hash,
    /// Hash of the full blob.
    pub blob_hash: Hash,
    /// Blob length in bytes.
    pub blob_size: usize,
}

/// Size, decode and version checks.
///
/// Identities are hashed here so that output-key expansion later cannot
/// change them.
pub fn parse_blob(
    blob: &[u8],
    max_blob_size: usize,
    max_version: u16,
) -> Result<ParsedTx, Rejected> {
    let malformed = |reason| (None, AdmissionOutcome::Malformed(reason));

    if blob.len() > max_blob_size {
        return Err(malformed(MalformedReason::TooLarge {
            size: blob.len(),
            max: max_blob_size,
        }));
    }

    let tx = parse_transaction(blob)
        .map_err(|e| malformed(MalformedReason::Unparseable(e.to_string())))?;
    let tx_id = tx_prefix_hash(&tx.prefix)
        .map_err(|e| malformed(MalformedReason::Unparseable(e.to_string())))?;

    let version = tx.version();
    if version == 0 || version > max_version {
        return Err((
            Some(tx_id),
            AdmissionOutcome::Malformed(MalformedReason::BadVersion(version)),
        ));
    }

    Ok(ParsedTx {
        tx,
        tx_id,
        blob_hash: blob_hash(blob),
        blob_size: blob.len(),
    })
}

/// Fill each RingCT output entry's `dest` from the matching plain output key.
///
/// Entries beyond the output count are left alone; the count mismatch is a
/// validation failure reported later.
pub fn expand_output_keys(tx: &mut Transaction) {
    let Some(rct) = tx.rct.as_mut() else {
        return;
    };
    for (ct, out) in rct.out_pk.iter_mut().zip(&tx.prefix.outputs) {
        if let Some(key) = out.key() {
            ct.dest = *key;
        }
    }
}
