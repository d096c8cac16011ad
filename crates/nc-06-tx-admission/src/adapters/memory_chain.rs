//! In-memory chain storage.
//!
//! Backs tests and local regression runs. Fault switches let callers drive
//! the storage-failure, rejected-block and reorganization paths.

use parking_lot::RwLock;
use shared_types::{serialize_transaction, tx_prefix_hash, Block, Hash, Transaction};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::ports::outbound::{
    ChainCommit, ChainView, CommitOutcome, FetchedTxs, NotarizationRequestMeta, StorageError,
};

/// Default cumulative block size limit.
pub const DEFAULT_BLOCK_SIZE_LIMIT: usize = 300_000;

#[derive(Debug)]
struct ChainState {
    height: u64,
    block_size_limit: usize,
    committed: HashMap<Hash, Vec<u8>>,
    noted_in_block: HashSet<Hash>,
    notarization_meta: HashMap<Hash, NotarizationRequestMeta>,
}

/// Thread-safe in-memory chain.
#[derive(Debug)]
pub struct MemoryChain {
    state: RwLock<ChainState>,
    fail_storage: AtomicBool,
    reject_blocks: AtomicBool,
    reorg_after_commit: AtomicBool,
}

impl Default for MemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChain {
    /// Empty chain at height zero.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ChainState {
                height: 0,
                block_size_limit: DEFAULT_BLOCK_SIZE_LIMIT,
                committed: HashMap::new(),
                noted_in_block: HashSet::new(),
                notarization_meta: HashMap::new(),
            }),
            fail_storage: AtomicBool::new(false),
            reject_blocks: AtomicBool::new(false),
            reorg_after_commit: AtomicBool::new(false),
        }
    }

    /// Move the chain tip.
    pub fn set_height(&self, height: u64) {
        self.state.write().height = height;
    }

    /// Change the cumulative block size limit.
    pub fn set_block_size_limit(&self, limit: usize) {
        self.state.write().block_size_limit = limit;
    }

    /// Store a transaction as committed without a block.
    pub fn insert_committed(&self, tx: &Transaction) {
        let (Ok(tx_id), Ok(blob)) = (tx_prefix_hash(&tx.prefix), serialize_transaction(tx)) else {
            return;
        };
        self.state.write().committed.insert(tx_id, blob);
    }

    /// Make every write and metadata read fail.
    pub fn fail_storage(&self, fail: bool) {
        self.fail_storage.store(fail, Ordering::SeqCst);
    }

    /// Report committed blocks as not accepted onto the main chain.
    pub fn reject_blocks(&self, reject: bool) {
        self.reject_blocks.store(reject, Ordering::SeqCst);
    }

    /// Drop a block's transactions right after accepting it.
    pub fn reorg_after_commit(&self, reorg: bool) {
        self.reorg_after_commit.store(reorg, Ordering::SeqCst);
    }

    /// Lose the stored metadata of a notarization request.
    pub fn forget_notarization_meta(&self, tx_id: &Hash) {
        self.state.write().notarization_meta.remove(tx_id);
    }

    /// Returns true if storage was told the transaction appeared in a block.
    pub fn was_noted_in_block(&self, tx_id: &Hash) -> bool {
        self.state.read().noted_in_block.contains(tx_id)
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.fail_storage.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("storage offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl ChainView for MemoryChain {
    fn have_tx(&self, tx_id: &Hash) -> bool {
        self.state.read().committed.contains_key(tx_id)
    }

    fn current_height(&self) -> u64 {
        self.state.read().height
    }

    fn block_size_limit(&self) -> usize {
        self.state.read().block_size_limit
    }

    fn fetch_txs(&self, tx_ids: &[Hash]) -> FetchedTxs {
        let state = self.state.read();
        let mut fetched = FetchedTxs::default();
        for tx_id in tx_ids {
            match state.committed.get(tx_id) {
                Some(blob) => fetched.found.push((*tx_id, blob.clone())),
                None => fetched.missing.push(*tx_id),
            }
        }
        fetched
    }

    fn notarization_request_meta(
        &self,
        tx_id: &Hash,
    ) -> Result<NotarizationRequestMeta, StorageError> {
        self.check_available()?;
        self.state
            .read()
            .notarization_meta
            .get(tx_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(hex::encode(tx_id)))
    }
}

impl ChainCommit for MemoryChain {
    fn note_tx_in_block(&self, tx_id: &Hash, _blob: &[u8]) -> Result<(), StorageError> {
        self.check_available()?;
        self.state.write().noted_in_block.insert(*tx_id);
        Ok(())
    }

    fn commit_block(
        &self,
        block: &Block,
        tx_blobs: &[Vec<u8>],
    ) -> Result<CommitOutcome, StorageError> {
        self.check_available()?;
        if tx_blobs.len() != block.tx_hashes.len() {
            return Err(StorageError::Corrupt(format!(
                "block lists {} transactions, {} blobs supplied",
                block.tx_hashes.len(),
                tx_blobs.len()
            )));
        }
        if self.reject_blocks.load(Ordering::SeqCst) {
            return Ok(CommitOutcome {
                accepted_to_main_chain: false,
                conflict: true,
            });
        }

        let mut state = self.state.write();
        state.height += 1;
        if !self.reorg_after_commit.load(Ordering::SeqCst) {
            for (tx_id, blob) in block.tx_hashes.iter().zip(tx_blobs) {
                state.committed.insert(*tx_id, blob.clone());
            }
        }
        Ok(CommitOutcome {
            accepted_to_main_chain: true,
            conflict: false,
        })
    }

    fn store_notarization_meta(
        &self,
        tx_id: &Hash,
        meta: &NotarizationRequestMeta,
    ) -> Result<(), StorageError> {
        self.check_available()?;
        self.state
            .write()
            .notarization_meta
            .insert(*tx_id, meta.clone());
        Ok(())
    }
}
