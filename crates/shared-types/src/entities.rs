//! # Core Domain Entities
//!
//! Transaction and block entities as they travel between the network,
//! the admission core and chain storage.
//!
//! ## Clusters
//!
//! - **Transactions**: `TransactionPrefix`, `Transaction`, `TxIn`, `TxOut`
//! - **Confidential amounts**: `RctSignatures`, `CtKey`, `RctType`
//! - **Notarization**: `NotarizationFields`
//! - **Blocks**: `BlockHeader`, `Block`

use serde::{Deserialize, Serialize};

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte Keccak-256 hash.
pub type Hash = [u8; 32];

/// A compressed Ed25519 point used as a one-time output key.
pub type PublicKey = [u8; 32];

/// A compressed Ed25519 point tagging a spent output.
pub type KeyImage = [u8; 32];

/// Pre-RingCT transaction.
pub const TX_VERSION_LEGACY: u16 = 1;

/// RingCT transaction.
pub const TX_VERSION_RINGCT: u16 = 2;

/// Fully-signed notarization transaction.
///
/// Held back from the pool until the chain passes the notarization wait height.
pub const TX_VERSION_NOTARIZATION: u16 = 3;

/// Partial-signature notarization request.
pub const TX_VERSION_NOTARIZATION_REQUEST: u16 = 4;

/// Highest transaction version this node understands.
pub const TX_VERSION_CURRENT: u16 = TX_VERSION_NOTARIZATION_REQUEST;

// =============================================================================
// CLUSTER A: TRANSACTIONS
// =============================================================================

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxIn {
    /// Coinbase marker; mints the block reward at `height`.
    Gen { height: u64 },
    /// Spend of a one-time output hidden in a ring of decoys.
    ToKey {
        /// Amount (zero for RingCT inputs).
        amount: u64,
        /// Ring member offsets.
        key_offsets: Vec<u64>,
        /// Key image of the real spent output.
        key_image: KeyImage,
    },
    /// Script spend. Not supported by this chain.
    ToScript {
        prev: Hash,
        prevout: u64,
        sigset: Vec<u8>,
    },
    /// Script-hash spend. Not supported by this chain.
    ToScriptHash {
        prev: Hash,
        prevout: u64,
        script: Vec<u8>,
        sigset: Vec<u8>,
    },
}

impl TxIn {
    /// Returns the key image for keyed inputs.
    pub fn key_image(&self) -> Option<&KeyImage> {
        match self {
            TxIn::ToKey { key_image, .. } => Some(key_image),
            _ => None,
        }
    }

    /// Returns the plain amount carried by the input, if any.
    pub fn amount(&self) -> u64 {
        match self {
            TxIn::ToKey { amount, .. } => *amount,
            _ => 0,
        }
    }
}

/// Destination of a transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxOutTarget {
    /// One-time public key.
    ToKey { key: PublicKey },
    /// Script output. Not supported by this chain.
    ToScript { keys: Vec<PublicKey>, script: Vec<u8> },
    /// Script-hash output. Not supported by this chain.
    ToScriptHash { hash: Hash },
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    /// Plain amount (zero for RingCT outputs).
    pub amount: u64,
    /// Destination.
    pub target: TxOutTarget,
}

impl TxOut {
    /// Returns the one-time key when the target is a key output.
    pub fn key(&self) -> Option<&PublicKey> {
        match &self.target {
            TxOutTarget::ToKey { key } => Some(key),
            _ => None,
        }
    }
}

/// Notarization request payload carried in the prefix.
///
/// Every partial signature toward one notarization event is a distinct
/// transaction; `prior_tx_hash` and `prior_blob_hash` chain it to the
/// submission it extends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NotarizationFields {
    /// Signer slots in fixed-width text form ("-1" marks an empty slot).
    pub signers_index: String,
    /// Number of signatures the sender claims are present.
    pub sig_count: u8,
    /// Digest of the cross-chain notarization payload being attested.
    pub payload_digest: Hash,
    /// Hash of the previous partial-signature transaction.
    pub prior_tx_hash: Hash,
    /// Hash of the previous partial-signature blob.
    pub prior_blob_hash: Hash,
}

/// The hashed portion of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPrefix {
    /// Version tag (see `TX_VERSION_*`).
    pub version: u16,
    /// Height or timestamp before which outputs are locked.
    pub unlock_time: u64,
    /// Ordered inputs.
    pub inputs: Vec<TxIn>,
    /// Ordered outputs.
    pub outputs: Vec<TxOut>,
    /// Tagged extra bytes (tx pubkey, nonce, notarization signer index).
    pub extra: Vec<u8>,
    /// Present on notarization requests only.
    pub notarization: Option<NotarizationFields>,
}

/// A full transaction: prefix plus optional RingCT bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Hashed prefix.
    pub prefix: TransactionPrefix,
    /// Confidential-amount signature bundle.
    pub rct: Option<RctSignatures>,
}

impl Transaction {
    /// Returns the version tag.
    pub fn version(&self) -> u16 {
        self.prefix.version
    }

    /// Returns true for a coinbase (single `Gen` input).
    pub fn is_coinbase(&self) -> bool {
        matches!(self.prefix.inputs.as_slice(), [TxIn::Gen { .. }])
    }

    /// Key images of all keyed inputs, in input order.
    pub fn key_images(&self) -> impl Iterator<Item = &KeyImage> {
        self.prefix.inputs.iter().filter_map(TxIn::key_image)
    }

    /// Notarization request payload, if present.
    pub fn notarization(&self) -> Option<&NotarizationFields> {
        self.prefix.notarization.as_ref()
    }
}

// =============================================================================
// CLUSTER B: CONFIDENTIAL AMOUNTS
// =============================================================================

/// RingCT bundle type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RctType {
    /// No bundle content; only valid on coinbase transactions.
    Null,
    /// Full MLSAG over all inputs.
    Full,
    /// Per-input MLSAG with pseudo-output commitments.
    Simple,
    /// Simple signatures with aggregated bulletproof range proofs.
    Bulletproof,
}

impl TryFrom<u8> for RctType {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(RctType::Null),
            1 => Ok(RctType::Full),
            2 => Ok(RctType::Simple),
            3 => Ok(RctType::Bulletproof),
            other => Err(other),
        }
    }
}

impl From<RctType> for u8 {
    fn from(kind: RctType) -> Self {
        match kind {
            RctType::Null => 0,
            RctType::Full => 1,
            RctType::Simple => 2,
            RctType::Bulletproof => 3,
        }
    }
}

/// Output key/commitment pair.
///
/// `dest` is not part of the wire form: it mirrors the plain output key and
/// is filled in after parsing, before any proof can be checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CtKey {
    /// One-time output key (resolved from the prefix, not serialized).
    #[serde(skip)]
    pub dest: PublicKey,
    /// Pedersen commitment to the output amount.
    pub mask: [u8; 32],
}

/// RingCT signature bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RctSignatures {
    /// Raw type tag; decoded with `RctType::try_from`.
    pub rct_type: u8,
    /// Plain fee.
    pub txn_fee: u64,
    /// One entry per output.
    pub out_pk: Vec<CtKey>,
    /// Range proofs (one per output, or one aggregate).
    pub range_proofs: Vec<Vec<u8>>,
    /// Ring signatures and pseudo-outputs.
    pub prunable: Vec<u8>,
}

impl RctSignatures {
    /// Decoded type tag, or the raw tag if unknown.
    pub fn kind(&self) -> Result<RctType, u8> {
        RctType::try_from(self.rct_type)
    }
}

// =============================================================================
// CLUSTER C: BLOCKS
// =============================================================================

/// Block header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockHeader {
    /// Hard-fork version.
    pub major_version: u8,
    /// Voting version.
    pub minor_version: u8,
    /// Unix timestamp.
    pub timestamp: u64,
    /// Hash of the parent block.
    pub prev_id: Hash,
    /// Proof-of-work nonce.
    pub nonce: u32,
}

/// A block: header, coinbase and references to pool transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Header.
    pub header: BlockHeader,
    /// Coinbase transaction.
    pub miner_tx: Transaction,
    /// Identities of the non-coinbase transactions, in block order.
    pub tx_hashes: Vec<Hash>,
}
