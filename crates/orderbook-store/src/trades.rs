use alloy_primitives::{Address, FixedBytes, B256, U256};
use dashmap::DashMap;
use orderbook_core::types::{EventKey, Fill, TradeRole};
use std::collections::HashSet;
use tracing::debug;

/// Total order of fills; most recent sorts highest
fn rank(fill: &Fill) -> (u64, u64, B256) {
    (fill.block_number, fill.key.log_index, fill.key.tx_hash)
}

/// Bounded most-recent-first list of fills, de-duplicated by event key
#[derive(Debug, Clone)]
pub struct TradeHistory {
    cap: usize,
    /// Descending by (block, log_index)
    fills: Vec<Fill>,
    keys: HashSet<EventKey>,
}

impl TradeHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            fills: Vec::with_capacity(cap.min(64)),
            keys: HashSet::new(),
        }
    }

    /// Insert a fill. Returns true if it is retained after truncation.
    pub fn insert(&mut self, fill: Fill) -> bool {
        if self.cap == 0 || self.keys.contains(&fill.key) {
            return false;
        }

        let new_rank = rank(&fill);
        let pos = self.fills.partition_point(|f| rank(f) > new_rank);
        if pos >= self.cap {
            return false;
        }

        self.keys.insert(fill.key);
        self.fills.insert(pos, fill);

        if self.fills.len() > self.cap {
            for evicted in self.fills.drain(self.cap..) {
                self.keys.remove(&evicted.key);
            }
        }
        true
    }

    pub fn contains(&self, key: &EventKey) -> bool {
        self.keys.contains(key)
    }

    /// Most recent first
    pub fn recent(&self, limit: usize) -> Vec<Fill> {
        self.fills.iter().take(limit).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fill> {
        self.fills.iter()
    }

    pub fn len(&self) -> usize {
        self.fills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fills.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}

/// Thread-safe trade histories per market, per taker and per maker
#[derive(Debug)]
pub struct TradeStore {
    cap: usize,
    market_trades: DashMap<FixedBytes<32>, TradeHistory>,
    taker_trades: DashMap<Address, TradeHistory>,
    maker_trades: DashMap<Address, TradeHistory>,
}

impl TradeStore {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            market_trades: DashMap::new(),
            taker_trades: DashMap::new(),
            maker_trades: DashMap::new(),
        }
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Record a fill in every history it belongs to (idempotent).
    /// Returns true if the market history retained it.
    pub fn record(&self, fill: Fill) -> bool {
        let cap = self.cap;
        let market_id = fill.market_id;
        let key = fill.key;

        if let Some(maker) = fill.maker {
            self.maker_trades
                .entry(maker)
                .or_insert_with(|| TradeHistory::new(cap))
                .insert(fill.clone());
        }
        self.taker_trades
            .entry(fill.taker)
            .or_insert_with(|| TradeHistory::new(cap))
            .insert(fill.clone());
        let retained = self
            .market_trades
            .entry(market_id)
            .or_insert_with(|| TradeHistory::new(cap))
            .insert(fill);

        debug!(
            market_id = ?market_id,
            tx_hash = ?key.tx_hash,
            log_index = key.log_index,
            retained = retained,
            "Fill recorded in trade history"
        );
        retained
    }

    /// Merge many fills
    pub fn record_all(&self, fills: impl IntoIterator<Item = Fill>) -> usize {
        fills.into_iter().map(|f| self.record(f)).filter(|retained| *retained).count()
    }

    /// Drop every history and rebuild from `fills`, which must cover the
    /// whole indexed range. Fills orphaned by a reorg do not survive.
    pub fn replace_all(&self, fills: impl IntoIterator<Item = Fill>) -> usize {
        self.market_trades.clear();
        self.taker_trades.clear();
        self.maker_trades.clear();
        self.record_all(fills)
    }

    /// Most recent fills in a market
    pub fn market_trades(&self, market_id: &FixedBytes<32>, limit: usize) -> Vec<Fill> {
        self.market_trades
            .get(market_id)
            .map(|h| h.recent(limit))
            .unwrap_or_default()
    }

    /// Most recent fills a user took part in, on the requested side
    pub fn user_trades(&self, user: &Address, role: TradeRole, limit: usize) -> Vec<Fill> {
        let from = |map: &DashMap<Address, TradeHistory>| {
            map.get(user).map(|h| h.recent(limit)).unwrap_or_default()
        };

        match role {
            TradeRole::Maker => from(&self.maker_trades),
            TradeRole::Taker => from(&self.taker_trades),
            TradeRole::Either => {
                let mut merged = from(&self.maker_trades);
                let mut keys: HashSet<EventKey> = merged.iter().map(|f| f.key).collect();
                merged.extend(
                    from(&self.taker_trades)
                        .into_iter()
                        .filter(|f| keys.insert(f.key)),
                );
                merged.sort_by(|a, b| rank(b).cmp(&rank(a)));
                merged.truncate(limit);
                merged
            }
        }
    }

    /// (token0, token1) volume across the retained fills of a market
    pub fn market_volume(&self, market_id: &FixedBytes<32>) -> (U256, U256) {
        self.market_trades
            .get(market_id)
            .map(|h| {
                h.iter().fold((U256::ZERO, U256::ZERO), |(v0, v1), f| {
                    (
                        v0.saturating_add(f.amount0_filled),
                        v1.saturating_add(f.amount1_spent),
                    )
                })
            })
            .unwrap_or((U256::ZERO, U256::ZERO))
    }

    /// Fills retained across all market histories
    pub fn count(&self) -> usize {
        self.market_trades.iter().map(|h| h.len()).sum()
    }
}

impl Default for TradeStore {
    fn default() -> Self {
        Self::new(orderbook_core::config::DEFAULT_TRADE_HISTORY_CAP)
    }
}
