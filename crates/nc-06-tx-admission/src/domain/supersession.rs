//! Retirement of notarization requests once a fully signed transaction lands.
//!
//! A committed notarization names the submission it completes through
//! `prior_tx_hash` and `prior_blob_hash`, and every request names its own
//! predecessor the same way. The chain is walked back from the committed
//! end; a link holds only while the pooled blob hashes to the advertised
//! value. Requests for the same payload on other branches are retired too.

use shared_types::{Hash, NotarizationFields, TX_VERSION_CURRENT};
use std::collections::{HashMap, HashSet};

use crate::domain::parsed::parse_blob;

/// A pooled notarization request, reduced to what supersession needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Prefix identity.
    pub tx_id: Hash,
    /// Hash of the pooled blob.
    pub blob_hash: Hash,
    /// Signer and chain fields.
    pub fields: NotarizationFields,
}

impl PendingRequest {
    /// Rebuild from a pooled blob. `None` if the blob carries no
    /// notarization fields.
    ///
    /// Pooled blobs already passed the size gate, so their own length bounds
    /// the re-parse.
    pub fn from_blob(blob: &[u8]) -> Option<Self> {
        let parsed = parse_blob(blob, blob.len(), TX_VERSION_CURRENT).ok()?;
        let fields = parsed.tx.notarization()?.clone();
        Some(Self {
            tx_id: parsed.tx_id,
            blob_hash: parsed.blob_hash,
            fields,
        })
    }
}

/// Requests made obsolete by a committed transaction carrying `committed`.
///
/// Result keeps the order of `pending`.
pub fn superseded_requests(
    committed: &NotarizationFields,
    pending: &[PendingRequest],
) -> Vec<Hash> {
    let by_id: HashMap<Hash, &PendingRequest> =
        pending.iter().map(|request| (request.tx_id, request)).collect();

    let mut chain: HashSet<Hash> = HashSet::new();
    let (mut prior_tx, mut prior_blob) = (committed.prior_tx_hash, committed.prior_blob_hash);
    while let Some(request) = by_id.get(&prior_tx) {
        if request.blob_hash != prior_blob || !chain.insert(request.tx_id) {
            break;
        }
        prior_tx = request.fields.prior_tx_hash;
        prior_blob = request.fields.prior_blob_hash;
    }

    pending
        .iter()
        .filter(|request| {
            chain.contains(&request.tx_id)
                || request.fields.payload_digest == committed.payload_digest
        })
        .map(|request| request.tx_id)
        .collect()
}
