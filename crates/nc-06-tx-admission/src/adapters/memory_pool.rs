//! In-memory pending pool.
//!
//! Two namespaces with independent capacities. Only the ordinary namespace
//! indexes key images: partial signatures toward one notarization event
//! spend the same inputs by construction.

use parking_lot::RwLock;
use shared_types::{Hash, KeyImage, Transaction};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use crate::ports::outbound::{
    AdmissionMeta, Backlog, PoolAdmit, PoolNamespace, PoolRejection, PoolView,
};

/// Default capacity of the ordinary namespace.
pub const DEFAULT_ORDINARY_CAPACITY: usize = 5_000;

/// Default capacity of the notarization namespace.
pub const DEFAULT_NOTARIZATION_CAPACITY: usize = 1_000;

#[derive(Debug, Clone)]
struct PooledTx {
    blob: Vec<u8>,
    namespace: PoolNamespace,
    key_images: Vec<KeyImage>,
    kept_by_block: bool,
    relayed: bool,
}

#[derive(Debug, Default)]
struct PoolState {
    entries: HashMap<Hash, PooledTx>,
    /// Insertion order per namespace, for stable sweeps.
    order: BTreeMap<PoolNamespace, Vec<Hash>>,
    spent: HashSet<KeyImage>,
}

/// Thread-safe in-memory pool.
#[derive(Debug)]
pub struct MemoryPool {
    ordinary_capacity: usize,
    notarization_capacity: usize,
    state: RwLock<PoolState>,
}

impl Default for MemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPool {
    /// Pool with default capacities.
    pub fn new() -> Self {
        Self::with_capacities(DEFAULT_ORDINARY_CAPACITY, DEFAULT_NOTARIZATION_CAPACITY)
    }

    /// Pool with explicit per-namespace capacities.
    pub fn with_capacities(ordinary: usize, notarization: usize) -> Self {
        Self {
            ordinary_capacity: ordinary,
            notarization_capacity: notarization,
            state: RwLock::new(PoolState::default()),
        }
    }

    /// Transactions held across both namespaces.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Returns true if the pool holds nothing.
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Returns true if the transaction was admitted from a block.
    pub fn kept_by_block(&self, tx_id: &Hash) -> Option<bool> {
        self.state.read().entries.get(tx_id).map(|e| e.kept_by_block)
    }

    /// Returns true if the transaction arrived from a peer.
    pub fn was_relayed(&self, tx_id: &Hash) -> Option<bool> {
        self.state.read().entries.get(tx_id).map(|e| e.relayed)
    }

    fn capacity(&self, namespace: PoolNamespace) -> usize {
        match namespace {
            PoolNamespace::Ordinary => self.ordinary_capacity,
            PoolNamespace::Notarization => self.notarization_capacity,
        }
    }
}

impl PoolView for MemoryPool {
    fn have(&self, tx_id: &Hash) -> bool {
        self.state.read().entries.contains_key(tx_id)
    }

    fn get_blob(&self, tx_id: &Hash) -> Option<Vec<u8>> {
        self.state.read().entries.get(tx_id).map(|e| e.blob.clone())
    }

    fn pending_ids(&self, namespace: PoolNamespace) -> Vec<Hash> {
        self.state
            .read()
            .order
            .get(&namespace)
            .cloned()
            .unwrap_or_default()
    }

    fn backlog(&self, namespace: PoolNamespace) -> Backlog {
        let state = self.state.read();
        state
            .entries
            .values()
            .filter(|e| e.namespace == namespace)
            .fold(Backlog::default(), |acc, e| Backlog {
                count: acc.count + 1,
                bytes: acc.bytes + e.blob.len(),
            })
    }
}

impl PoolAdmit for MemoryPool {
    fn admit(
        &self,
        tx: &Transaction,
        blob: &[u8],
        meta: &AdmissionMeta,
    ) -> Result<(), PoolRejection> {
        let mut state = self.state.write();

        if state.entries.contains_key(&meta.tx_id) {
            return Err(PoolRejection::AlreadyPooled);
        }

        let capacity = self.capacity(meta.namespace);
        let held = state.order.get(&meta.namespace).map_or(0, Vec::len);
        if held >= capacity {
            return Err(PoolRejection::Full {
                namespace: meta.namespace,
                capacity,
            });
        }

        let key_images: Vec<KeyImage> = match meta.namespace {
            PoolNamespace::Ordinary => tx.key_images().copied().collect(),
            PoolNamespace::Notarization => Vec::new(),
        };
        if key_images.iter().any(|ki| state.spent.contains(ki)) {
            return Err(PoolRejection::KeyImageSpent);
        }

        state.spent.extend(key_images.iter().copied());
        state.order.entry(meta.namespace).or_default().push(meta.tx_id);
        state.entries.insert(
            meta.tx_id,
            PooledTx {
                blob: blob.to_vec(),
                namespace: meta.namespace,
                key_images,
                kept_by_block: meta.kept_by_block,
                relayed: meta.relayed,
            },
        );
        debug!(
            "[nc-06] pooled {} in {:?} ({} bytes)",
            hex::encode(meta.tx_id),
            meta.namespace,
            meta.blob_size
        );
        Ok(())
    }

    fn remove(&self, tx_ids: &[Hash]) {
        let mut state = self.state.write();
        for tx_id in tx_ids {
            let Some(entry) = state.entries.remove(tx_id) else {
                continue;
            };
            for ki in &entry.key_images {
                state.spent.remove(ki);
            }
            if let Some(ids) = state.order.get_mut(&entry.namespace) {
                ids.retain(|id| id != tx_id);
            }
        }
    }
}
