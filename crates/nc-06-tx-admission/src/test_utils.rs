//! Test fixtures: transaction builders, mock collaborators and a wired node.
//!
//! Compiled for this crate's tests and, through the `test-utils` feature,
//! for the workspace test suite.

use parking_lot::Mutex;
use shared_crypto::{is_valid_point, public_key_from_secret};
use shared_types::extra::encode_extra;
use shared_types::{
    blob_hash, serialize_transaction, tx_prefix_hash, Block, BlockHeader, CtKey, ExtraField, Hash,
    KeyImage, NotarizationFields, PublicKey, RctSignatures, Transaction, TransactionPrefix, TxIn,
    TxOut, TxOutTarget, TX_VERSION_NOTARIZATION, TX_VERSION_NOTARIZATION_REQUEST,
    TX_VERSION_RINGCT,
};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::adapters::memory_pool::{DEFAULT_NOTARIZATION_CAPACITY, DEFAULT_ORDINARY_CAPACITY};
use crate::adapters::{ChannelRelay, MemoryChain, MemoryPool};
use crate::config::{AdmissionConfig, NetworkType};
use crate::error::AdmissionError;
use crate::ports::outbound::{
    CheckpointSource, IntegritySupervisor, MinerControl, OutboundMessage, ProofVerifier,
    TimeSource, Timestamp,
};
use crate::service::{AdmissionDeps, TxAdmissionService};

// =============================================================================
// KEYS
// =============================================================================

/// Deterministic prime-order point `n * G`.
pub fn key(n: u64) -> PublicKey {
    let mut secret = [0u8; 32];
    secret[..8].copy_from_slice(&n.to_le_bytes());
    public_key_from_secret(&secret)
}

/// Encoding of (0, -1), the point of order two.
pub const ORDER_TWO_POINT: [u8; 32] = {
    let mut bytes = [0xffu8; 32];
    bytes[0] = 0xec;
    bytes[31] = 0x7f;
    bytes
};

/// Bytes that do not decode to a curve point.
pub fn off_curve_bytes() -> [u8; 32] {
    (2u8..=255)
        .map(|y| {
            let mut bytes = [0u8; 32];
            bytes[0] = y;
            bytes
        })
        .find(|bytes| !is_valid_point(bytes))
        .expect("some small y has no matching x")
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Builds valid RingCT transactions, with knobs to break them.
///
/// The same seed always yields the same transaction.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    seed: u64,
    version: u16,
    output_key: Option<PublicKey>,
    key_images: Option<Vec<KeyImage>>,
    offsets: Vec<u64>,
    rct_type: u8,
    notarization: Option<NotarizationFields>,
    extra_index: Option<u8>,
}

impl TxBuilder {
    /// Version 2, one input, one output, bulletproof bundle.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            version: TX_VERSION_RINGCT,
            output_key: None,
            key_images: None,
            offsets: vec![10, 4, 7],
            rct_type: 3,
            notarization: None,
            extra_index: None,
        }
    }

    /// Version 4 notarization request for one shared event.
    pub fn notarization_request(
        seed: u64,
        signers_index: &str,
        sig_count: u8,
        extra_index: u8,
    ) -> Self {
        let mut builder = Self::new(seed).version(TX_VERSION_NOTARIZATION_REQUEST);
        builder.notarization = Some(NotarizationFields {
            signers_index: signers_index.to_string(),
            sig_count,
            payload_digest: [0x5a; 32],
            prior_tx_hash: [0; 32],
            prior_blob_hash: [0; 32],
        });
        builder.extra_index = Some(extra_index);
        builder
    }

    /// Transaction of `version` chained onto `prior`, same payload digest.
    fn chained(
        seed: u64,
        prior: &TxBuilder,
        version: u16,
        signers_index: &str,
        sig_count: u8,
    ) -> Self {
        let payload_digest = prior
            .notarization
            .as_ref()
            .map_or([0x5a; 32], |fields| fields.payload_digest);
        let mut builder = Self::new(seed).version(version);
        builder.notarization = Some(NotarizationFields {
            signers_index: signers_index.to_string(),
            sig_count,
            payload_digest,
            prior_tx_hash: prior.tx_id(),
            prior_blob_hash: blob_hash(&prior.blob()),
        });
        builder
    }

    /// Next partial signature after `prior`.
    pub fn next_request(
        seed: u64,
        prior: &TxBuilder,
        signers_index: &str,
        sig_count: u8,
        extra_index: u8,
    ) -> Self {
        let mut builder = Self::chained(
            seed,
            prior,
            TX_VERSION_NOTARIZATION_REQUEST,
            signers_index,
            sig_count,
        );
        builder.extra_index = Some(extra_index);
        builder
    }

    /// Fully signed notarization completing `prior`'s chain.
    pub fn completing(seed: u64, prior: &TxBuilder, signers_index: &str, sig_count: u8) -> Self {
        Self::chained(seed, prior, TX_VERSION_NOTARIZATION, signers_index, sig_count)
    }

    pub fn payload_digest(mut self, digest: Hash) -> Self {
        if let Some(fields) = self.notarization.as_mut() {
            fields.payload_digest = digest;
        }
        self
    }

    pub fn version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    pub fn output_key(mut self, key: PublicKey) -> Self {
        self.output_key = Some(key);
        self
    }

    /// One input per key image.
    pub fn key_images(mut self, images: &[KeyImage]) -> Self {
        self.key_images = Some(images.to_vec());
        self
    }

    pub fn offsets(mut self, offsets: Vec<u64>) -> Self {
        self.offsets = offsets;
        self
    }

    pub fn rct_type(mut self, rct_type: u8) -> Self {
        self.rct_type = rct_type;
        self
    }

    pub fn build(&self) -> Transaction {
        let images = self
            .key_images
            .clone()
            .unwrap_or_else(|| vec![key(1000 + self.seed)]);
        let inputs = images
            .into_iter()
            .map(|key_image| TxIn::ToKey {
                amount: 0,
                key_offsets: self.offsets.clone(),
                key_image,
            })
            .collect();

        let mut extra = vec![ExtraField::PubKey(key(2000 + self.seed))];
        if let Some(index) = self.extra_index {
            extra.push(ExtraField::SignerIndex(index));
        }

        Transaction {
            prefix: TransactionPrefix {
                version: self.version,
                unlock_time: 0,
                inputs,
                outputs: vec![TxOut {
                    amount: 0,
                    target: TxOutTarget::ToKey {
                        key: self.output_key.unwrap_or_else(|| key(self.seed)),
                    },
                }],
                extra: encode_extra(&extra),
                notarization: self.notarization.clone(),
            },
            rct: Some(RctSignatures {
                rct_type: self.rct_type,
                txn_fee: 100,
                out_pk: vec![CtKey {
                    dest: [0; 32],
                    mask: key(3000 + self.seed),
                }],
                range_proofs: vec![vec![self.seed as u8; 16]],
                prunable: vec![],
            }),
        }
    }

    pub fn blob(&self) -> Vec<u8> {
        serialize_transaction(&self.build()).expect("builder output encodes")
    }

    pub fn tx_id(&self) -> Hash {
        tx_prefix_hash(&self.build().prefix).expect("builder prefix encodes")
    }
}

/// Block at height 1 referencing `tx_hashes`.
pub fn block_with(tx_hashes: Vec<Hash>) -> Block {
    let miner_tx = Transaction {
        prefix: TransactionPrefix {
            version: TX_VERSION_RINGCT,
            unlock_time: 61,
            inputs: vec![TxIn::Gen { height: 1 }],
            outputs: vec![TxOut {
                amount: 17_000_000,
                target: TxOutTarget::ToKey { key: key(9_999) },
            }],
            extra: encode_extra(&[ExtraField::PubKey(key(9_998))]),
            notarization: None,
        },
        rct: Some(RctSignatures {
            rct_type: 0,
            txn_fee: 0,
            out_pk: vec![CtKey::default()],
            range_proofs: vec![],
            prunable: vec![],
        }),
    };
    Block {
        header: BlockHeader {
            major_version: 1,
            timestamp: 1_700_000_000,
            ..BlockHeader::default()
        },
        miner_tx,
        tx_hashes,
    }
}

// =============================================================================
// MOCK COLLABORATORS
// =============================================================================

/// Proof verifier with a switchable verdict and a call counter.
#[derive(Debug)]
pub struct MockProofVerifier {
    accept: AtomicBool,
    calls: AtomicUsize,
}

impl MockProofVerifier {
    pub fn accepting() -> Self {
        Self {
            accept: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_accept(&self, accept: bool) {
        self.accept.store(accept, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn verdict(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.accept.load(Ordering::SeqCst)
    }
}

impl ProofVerifier for MockProofVerifier {
    fn verify_full(&self, _rct: &RctSignatures, _semantics_only: bool) -> bool {
        self.verdict()
    }

    fn verify_simple(&self, _rct: &RctSignatures, _semantics_only: bool) -> bool {
        self.verdict()
    }

    fn verify_bulletproof(&self, _rct: &RctSignatures, _semantics_only: bool) -> bool {
        self.verdict()
    }
}

/// Miner that counts control calls.
#[derive(Debug, Default)]
pub struct MockMiner {
    pauses: AtomicUsize,
    resumes: AtomicUsize,
    template_refreshes: AtomicUsize,
}

impl MockMiner {
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn resumes(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn template_refreshes(&self) -> usize {
        self.template_refreshes.load(Ordering::SeqCst)
    }
}

impl MinerControl for MockMiner {
    fn pause(&self) {
        self.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&self) {
        self.resumes.fetch_add(1, Ordering::SeqCst);
    }

    fn refresh_template(&self) {
        self.template_refreshes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Checkpoint source returning a fixed verdict.
#[derive(Debug)]
pub struct MockCheckpointSource {
    result: AtomicBool,
    calls: AtomicUsize,
    last_path: Mutex<Option<String>>,
}

impl MockCheckpointSource {
    pub fn new(result: bool) -> Self {
        Self {
            result: AtomicBool::new(result),
            calls: AtomicUsize::new(0),
            last_path: Mutex::new(None),
        }
    }

    pub fn set_result(&self, result: bool) {
        self.result.store(result, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_path(&self) -> Option<String> {
        self.last_path.lock().clone()
    }
}

impl CheckpointSource for MockCheckpointSource {
    fn refresh(&self, path: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_path.lock() = Some(path.to_string());
        self.result.load(Ordering::SeqCst)
    }
}

/// Mock time source for testing.
#[derive(Debug)]
pub struct MockTimeSource {
    time: AtomicU64,
}

impl MockTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: AtomicU64::new(initial),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.time.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, time: Timestamp) {
        self.time.store(time, Ordering::SeqCst);
    }
}

impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.time.load(Ordering::SeqCst)
    }
}

/// Supervisor that panics, so tests can observe integrity failures.
#[derive(Debug, Clone, Copy, Default)]
pub struct PanicSupervisor;

impl IntegritySupervisor for PanicSupervisor {
    fn integrity_fatal(&self, reason: &str) -> ! {
        panic!("integrity failure: {}", reason)
    }
}

// =============================================================================
// WIRED NODE
// =============================================================================

/// Defaults with a small worker pool and no checkpoints.
pub fn test_config() -> AdmissionConfig {
    AdmissionConfig {
        network: NetworkType::Fakechain,
        worker_threads: 2,
        ..AdmissionConfig::default()
    }
}

/// Admission service over in-memory pool and chain, with mock collaborators.
pub struct TestNode {
    pub service: TxAdmissionService,
    pub pool: Arc<MemoryPool>,
    pub chain: Arc<MemoryChain>,
    pub verifier: Arc<MockProofVerifier>,
    pub miner: Arc<MockMiner>,
    pub checkpoints: Arc<MockCheckpointSource>,
    pub time: Arc<MockTimeSource>,
    relay_rx: Mutex<UnboundedReceiver<OutboundMessage>>,
}

impl TestNode {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AdmissionConfig) -> Self {
        Self::try_with_config(config).expect("test node config is valid")
    }

    pub fn with_pool_capacity(config: AdmissionConfig, ordinary: usize, notarization: usize) -> Self {
        Self::build(config, MemoryPool::with_capacities(ordinary, notarization))
            .expect("test node config is valid")
    }

    pub fn try_with_config(config: AdmissionConfig) -> Result<Self, AdmissionError> {
        Self::build(
            config,
            MemoryPool::with_capacities(DEFAULT_ORDINARY_CAPACITY, DEFAULT_NOTARIZATION_CAPACITY),
        )
    }

    fn build(config: AdmissionConfig, pool: MemoryPool) -> Result<Self, AdmissionError> {
        let pool = Arc::new(pool);
        let chain = Arc::new(MemoryChain::new());
        let verifier = Arc::new(MockProofVerifier::accepting());
        let miner = Arc::new(MockMiner::default());
        let checkpoints = Arc::new(MockCheckpointSource::new(true));
        let time = Arc::new(MockTimeSource::new(1_700_000_000_000));
        let (relay, relay_rx) = ChannelRelay::new();

        let service = TxAdmissionService::new(
            config,
            AdmissionDeps {
                chain_view: chain.clone(),
                chain_commit: chain.clone(),
                pool_view: pool.clone(),
                pool_admit: pool.clone(),
                verifier: verifier.clone(),
                relay: Arc::new(relay),
                miner: miner.clone(),
                checkpoints: checkpoints.clone(),
                time: time.clone(),
                supervisor: Arc::new(PanicSupervisor),
            },
        )?;

        Ok(Self {
            service,
            pool,
            chain,
            verifier,
            miner,
            checkpoints,
            time,
            relay_rx: Mutex::new(relay_rx),
        })
    }

    /// Drain every message relayed so far.
    pub fn relay_messages(&self) -> Vec<OutboundMessage> {
        let mut rx = self.relay_rx.lock();
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }
}
