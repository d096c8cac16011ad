//! # Rejection Cache
//!
//! Remembers identities of recently rejected transactions in two bounded
//! generations. When generation 0 fills, it becomes generation 1 and the old
//! generation 1 is dropped. At most `2 * capacity` identities are held and the
//! most recent `capacity / 2` insertions are always present.
//!
//! The cache never influences admission; callers use it to rate-limit peers.

use parking_lot::Mutex;
use shared_types::Hash;
use std::collections::HashSet;

#[derive(Debug, Default)]
struct Generations {
    current: HashSet<Hash>,
    previous: HashSet<Hash>,
}

/// Two-generation bounded set of rejected transaction identities.
#[derive(Debug)]
pub struct RejectionCache {
    capacity: usize,
    generations: Mutex<Generations>,
}

impl RejectionCache {
    /// Create a cache holding `capacity` identities per generation.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            generations: Mutex::new(Generations::default()),
        }
    }

    /// Record a rejected identity.
    pub fn record(&self, tx_id: Hash) {
        let mut gens = self.generations.lock();
        gens.current.insert(tx_id);
        if gens.current.len() >= self.capacity {
            gens.previous = std::mem::take(&mut gens.current);
        }
    }

    /// Returns true if `tx_id` is still remembered.
    pub fn was_recently_rejected(&self, tx_id: &Hash) -> bool {
        let gens = self.generations.lock();
        gens.current.contains(tx_id) || gens.previous.contains(tx_id)
    }

    /// Number of distinct identities remembered.
    pub fn len(&self) -> usize {
        let gens = self.generations.lock();
        gens.current.union(&gens.previous).count()
    }

    /// Returns true if nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-generation capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
