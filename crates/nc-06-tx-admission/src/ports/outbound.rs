//! Outbound (Driven) ports for the admission subsystem.
//!
//! Storage and the pending pool each expose a read port and a write port.
//! Read ports are shared freely; write ports are owned by the
//! `IngestionGate` and reachable only through an `IngestionSession`.

use shared_types::{Block, Hash, RctSignatures, Transaction};
use thiserror::Error;

use crate::domain::signers::SignerSlots;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

// =============================================================================
// STORAGE
// =============================================================================

/// Storage engine failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Backend unreachable or refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// Requested record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),
    /// Stored record failed to decode.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Result of committing a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Block extended the main chain.
    pub accepted_to_main_chain: bool,
    /// Block conflicted with chain state (alternative chain or invalid).
    pub conflict: bool,
}

/// Transactions fetched from committed storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedTxs {
    /// Found blobs, in request order.
    pub found: Vec<(Hash, Vec<u8>)>,
    /// Identities storage does not hold.
    pub missing: Vec<Hash>,
}

/// Stored metadata of a pending notarization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotarizationRequestMeta {
    /// Signer slots as admitted.
    pub signers: SignerSlots,
    /// Asserted signature count.
    pub sig_count: u8,
    /// Digest of the notarized payload.
    pub payload_digest: Hash,
}

/// Read-side storage queries.
pub trait ChainView: Send + Sync {
    /// Returns true if the transaction is committed.
    fn have_tx(&self, tx_id: &Hash) -> bool;

    /// Current chain height.
    fn current_height(&self) -> u64;

    /// Current cumulative block size limit, in bytes.
    fn block_size_limit(&self) -> usize;

    /// Fetch committed transactions by identity.
    fn fetch_txs(&self, tx_ids: &[Hash]) -> FetchedTxs;

    /// Metadata recorded when a notarization request was admitted.
    fn notarization_request_meta(
        &self,
        tx_id: &Hash,
    ) -> Result<NotarizationRequestMeta, StorageError>;
}

/// Write-side storage operations. Only called through an `IngestionSession`.
pub trait ChainCommit: Send + Sync {
    /// Record that a transaction appeared in a block being applied.
    fn note_tx_in_block(&self, tx_id: &Hash, blob: &[u8]) -> Result<(), StorageError>;

    /// Commit a block with the blobs of its non-coinbase transactions.
    fn commit_block(&self, block: &Block, tx_blobs: &[Vec<u8>])
        -> Result<CommitOutcome, StorageError>;

    /// Persist metadata for an admitted notarization request.
    fn store_notarization_meta(
        &self,
        tx_id: &Hash,
        meta: &NotarizationRequestMeta,
    ) -> Result<(), StorageError>;
}

// =============================================================================
// PENDING POOL
// =============================================================================

/// Separate bounded spaces inside the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PoolNamespace {
    /// Ordinary and fully-signed notarization transactions.
    Ordinary,
    /// Partial-signature notarization requests.
    Notarization,
}

/// Pool refusal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolRejection {
    /// A pooled transaction already spends one of the key images.
    #[error("key image already spent by a pooled transaction")]
    KeyImageSpent,
    /// Namespace is at capacity.
    #[error("{namespace:?} pool full at {capacity} transactions")]
    Full {
        namespace: PoolNamespace,
        capacity: usize,
    },
    /// Identity already pooled.
    #[error("transaction already pooled")]
    AlreadyPooled,
}

/// Admission metadata handed to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionMeta {
    /// Prefix identity.
    pub tx_id: Hash,
    /// Blob length in bytes.
    pub blob_size: usize,
    /// Transaction came from a block.
    pub kept_by_block: bool,
    /// Transaction was relayed by a peer.
    pub relayed: bool,
    /// Target namespace.
    pub namespace: PoolNamespace,
}

/// Pool occupancy of one namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Backlog {
    /// Transactions held.
    pub count: usize,
    /// Sum of blob sizes.
    pub bytes: usize,
}

/// Read-side pool queries.
pub trait PoolView: Send + Sync {
    /// Returns true if the pool holds the transaction.
    fn have(&self, tx_id: &Hash) -> bool;

    /// Blob of a pooled transaction.
    fn get_blob(&self, tx_id: &Hash) -> Option<Vec<u8>>;

    /// Identities held in a namespace.
    fn pending_ids(&self, namespace: PoolNamespace) -> Vec<Hash>;

    /// Occupancy of a namespace.
    fn backlog(&self, namespace: PoolNamespace) -> Backlog;
}

/// Write-side pool operations. Only called through an `IngestionSession`.
pub trait PoolAdmit: Send + Sync {
    /// Add a verified transaction.
    fn admit(
        &self,
        tx: &Transaction,
        blob: &[u8],
        meta: &AdmissionMeta,
    ) -> Result<(), PoolRejection>;

    /// Drop transactions that were committed in a block.
    fn remove(&self, tx_ids: &[Hash]);
}

// =============================================================================
// CRYPTO, RELAY, CHECKPOINTS, MINER
// =============================================================================

/// RingCT proof verification, one routine per bundle type.
pub trait ProofVerifier: Send + Sync {
    /// Full MLSAG bundle.
    fn verify_full(&self, rct: &RctSignatures, semantics_only: bool) -> bool;

    /// Simple (per-input) bundle.
    fn verify_simple(&self, rct: &RctSignatures, semantics_only: bool) -> bool;

    /// Simple bundle with aggregated bulletproofs.
    fn verify_bulletproof(&self, rct: &RctSignatures, semantics_only: bool) -> bool;
}

/// Relay hand-off failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The network side stopped receiving.
    #[error("relay channel closed")]
    ChannelClosed,
}

/// Notarization request re-encoded for the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedNotarizationRequest {
    /// Prefix identity.
    pub tx_id: Hash,
    /// Signer slots in text form.
    pub signers_index: String,
    /// Asserted signature count.
    pub sig_count: u8,
    /// Digest of the notarized payload.
    pub payload_digest: Hash,
    /// Full transaction blob.
    pub blob: Vec<u8>,
}

/// Messages handed to the network layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Newly admitted transaction blobs.
    Transactions(Vec<Vec<u8>>),
    /// A pending notarization request.
    NotarizationRequest(EncodedNotarizationRequest),
    /// A locally found block with its transactions.
    Block {
        block_blob: Vec<u8>,
        tx_blobs: Vec<Vec<u8>>,
    },
}

/// Fire-and-forget network relay.
pub trait RelaySink: Send + Sync {
    /// Broadcast transaction blobs.
    fn relay_transactions(&self, blobs: Vec<Vec<u8>>) -> Result<(), RelayError>;

    /// Broadcast a notarization request.
    fn relay_notarization_request(
        &self,
        request: EncodedNotarizationRequest,
    ) -> Result<(), RelayError>;

    /// Broadcast a found block.
    fn relay_block(&self, block_blob: Vec<u8>, tx_blobs: Vec<Vec<u8>>)
        -> Result<(), RelayError>;
}

/// External checkpoint source.
pub trait CheckpointSource: Send + Sync {
    /// Reload checkpoints; false means the loaded set cannot be trusted.
    fn refresh(&self, path: &str) -> bool;
}

/// Block production control.
pub trait MinerControl: Send + Sync {
    /// Stop hashing.
    fn pause(&self);
    /// Resume hashing.
    fn resume(&self);
    /// Rebuild the block template from the current chain tip and pool.
    fn refresh_template(&self);
}

/// Receives unrecoverable integrity failures.
pub trait IntegritySupervisor: Send + Sync {
    /// Terminate the process. Never returns.
    fn integrity_fatal(&self, reason: &str) -> !;
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}
