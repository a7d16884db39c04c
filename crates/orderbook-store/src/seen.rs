//! Live-event identifiers already applied to the book, organized by block.

use orderbook_core::types::EventKey;
use std::collections::{BTreeMap, HashSet};

/// Event keys applied by the live path since the last snapshot commit
#[derive(Debug, Clone, Default)]
pub struct SeenEvents {
    /// Block number -> keys applied in that block
    by_block: BTreeMap<u64, HashSet<EventKey>>,
    /// Lifetime counter, survives `clear`
    total_recorded: u64,
}

impl SeenEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an applied event. Returns false if the key was already present.
    pub fn insert(&mut self, block_number: u64, key: EventKey) -> bool {
        let fresh = self.by_block.entry(block_number).or_default().insert(key);
        if fresh {
            self.total_recorded += 1;
        }
        fresh
    }

    pub fn contains(&self, block_number: u64, key: &EventKey) -> bool {
        self.by_block
            .get(&block_number)
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }

    /// Forget every block at or below `block`
    pub fn prune_through(&mut self, block: u64) -> usize {
        let keep = self.by_block.split_off(&(block.saturating_add(1)));
        let dropped = std::mem::replace(&mut self.by_block, keep);
        dropped.values().map(HashSet::len).sum()
    }

    pub fn clear(&mut self) {
        self.by_block.clear();
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.by_block.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_block.is_empty()
    }

    pub fn blocks_tracked(&self) -> usize {
        self.by_block.len()
    }

    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }
}
