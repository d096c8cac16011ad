//! # Blob Codec
//!
//! Decoding and hashing of transaction and block blobs.
//!
//! Blobs use the default `bincode` configuration (fixed-width little-endian
//! integers, length-prefixed sequences). Decoding is strict: every byte of the
//! blob must be consumed.

use crate::entities::{Block, Hash, Transaction, TransactionPrefix};
use crate::errors::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_crypto::{keccak256, keccak256_many};

fn decode_exact<T: DeserializeOwned + Serialize>(blob: &[u8]) -> Result<T, CodecError> {
    let value: T = bincode::deserialize(blob)?;
    let consumed =
        bincode::serialized_size(&value).map_err(|e| CodecError::Encode(e.to_string()))?;
    if consumed != blob.len() as u64 {
        return Err(CodecError::TrailingBytes {
            consumed,
            total: blob.len() as u64,
        });
    }
    Ok(value)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a transaction blob.
pub fn parse_transaction(blob: &[u8]) -> Result<Transaction, CodecError> {
    decode_exact(blob)
}

/// Encode a transaction into its blob form.
pub fn serialize_transaction(tx: &Transaction) -> Result<Vec<u8>, CodecError> {
    encode(tx)
}

/// Transaction identity: Keccak-256 over the encoded prefix.
pub fn tx_prefix_hash(prefix: &TransactionPrefix) -> Result<Hash, CodecError> {
    Ok(keccak256(&encode(prefix)?))
}

/// Keccak-256 over a full blob.
pub fn blob_hash(blob: &[u8]) -> Hash {
    keccak256(blob)
}

/// Decode a block blob.
pub fn parse_block(blob: &[u8]) -> Result<Block, CodecError> {
    decode_exact(blob)
}

/// Encode a block into its blob form.
pub fn serialize_block(block: &Block) -> Result<Vec<u8>, CodecError> {
    encode(block)
}

/// Block identity: Keccak-256 over header, coinbase identity and tx hashes.
pub fn block_hash(block: &Block) -> Result<Hash, CodecError> {
    let header = encode(&block.header)?;
    let miner_tx_id = tx_prefix_hash(&block.miner_tx.prefix)?;
    let mut parts: Vec<&[u8]> = Vec::with_capacity(block.tx_hashes.len() + 2);
    parts.push(&header);
    parts.push(&miner_tx_id);
    for hash in &block.tx_hashes {
        parts.push(hash);
    }
    Ok(keccak256_many(&parts))
}
