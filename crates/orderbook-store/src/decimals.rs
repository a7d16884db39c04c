use alloy_primitives::Address;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Token decimals with a time-to-live. Expired entries read as missing.
#[derive(Debug)]
pub struct DecimalsCache {
    ttl: Duration,
    entries: DashMap<Address, (u8, Instant)>,
}

impl DecimalsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Cached decimals for `token`, if present and not expired
    pub fn get(&self, token: &Address) -> Option<u8> {
        self.get_at(token, Instant::now())
    }

    fn get_at(&self, token: &Address, now: Instant) -> Option<u8> {
        let entry = self.entries.get(token)?;
        let (decimals, fetched_at) = *entry;
        if now.saturating_duration_since(fetched_at) < self.ttl {
            Some(decimals)
        } else {
            None
        }
    }

    pub fn insert(&self, token: Address, decimals: u8) {
        self.insert_at(token, decimals, Instant::now());
    }

    fn insert_at(&self, token: Address, decimals: u8, now: Instant) {
        self.entries.insert(token, (decimals, now));
        debug!(token = ?token, decimals = decimals, "Token decimals cached");
    }

    /// Tokens with no live entry, e.g. to decide what to fetch
    pub fn missing(&self, tokens: &[Address]) -> Vec<Address> {
        tokens
            .iter()
            .filter(|t| self.get(t).is_none())
            .copied()
            .collect()
    }

    /// Drop expired entries, returning how many were removed
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    fn evict_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries
            .retain(|_, (_, fetched_at)| now.saturating_duration_since(*fetched_at) < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
