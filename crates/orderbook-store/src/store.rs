use alloy_primitives::{Address, FixedBytes, U256};
use orderbook_core::types::{LogMeta, MarketStats, Order, OrderKey};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::decimals::DecimalsCache;
use crate::markets::MarketStore;
use crate::orders::{DeltaOutcome, OrderBook};
use crate::seen::SeenEvents;
use crate::sync_state::SyncStatus;
use crate::trades::TradeStore;

/// Live-event keys are kept for this many blocks behind the live cursor
pub const SEEN_RETENTION_BLOCKS: u64 = 256;

/// Verdict on a live event before it touches the book
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Apply it; the key is now recorded
    Fresh,
    /// At or below the cutover, already covered by the snapshot
    Stale,
    /// Already applied by an earlier batch
    Duplicate,
    /// No snapshot committed yet
    NoCutover,
}

/// The single owned state cell: open orders plus the live reconciliation bookkeeping.
/// Every mutation happens under one write lock on the enclosing `RwLock`.
#[derive(Debug, Default)]
pub struct BookState {
    book: OrderBook,
    seen: SeenEvents,
    cutover_block: Option<u64>,
    /// Next block the live watcher should fetch
    live_cursor: Option<u64>,
    generation: u64,
}

impl BookState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the book wholesale with a freshly folded snapshot covering
    /// blocks up to `to_block`. Returns the new generation.
    pub fn commit_snapshot(&mut self, book: OrderBook, to_block: u64) -> u64 {
        self.book = book;
        self.seen.clear();
        self.cutover_block = Some(to_block);
        self.live_cursor = Some(to_block.saturating_add(1));
        self.generation += 1;
        self.generation
    }

    /// Decide whether a live event may be applied, recording it if so
    pub fn admit(&mut self, meta: &LogMeta) -> Admission {
        let Some(cutover) = self.cutover_block else {
            return Admission::NoCutover;
        };
        if meta.block_number <= cutover {
            return Admission::Stale;
        }
        if !self.seen.insert(meta.block_number, meta.key) {
            return Admission::Duplicate;
        }
        Admission::Fresh
    }

    /// Insert a live-created order
    pub fn insert_order(&mut self, order: Order) -> bool {
        self.book.insert(order)
    }

    /// Apply a live delta, removing the order immediately once nothing is left
    pub fn apply_delta(&mut self, key: &OrderKey, amount0: U256) -> DeltaOutcome {
        let outcome = self.book.apply_delta(key, amount0);
        if outcome.is_exhausted() {
            self.book.remove(key);
        }
        outcome
    }

    /// Move the live cursor past `to_block` and forget old seen keys
    pub fn advance_cursor(&mut self, to_block: u64) {
        let next = to_block.saturating_add(1);
        if self.live_cursor.map_or(true, |cursor| next > cursor) {
            self.live_cursor = Some(next);
        }
        self.seen
            .prune_through(to_block.saturating_sub(SEEN_RETENTION_BLOCKS));
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn cutover_block(&self) -> Option<u64> {
        self.cutover_block
    }

    pub fn live_cursor(&self) -> Option<u64> {
        self.live_cursor
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn seen(&self) -> &SeenEvents {
        &self.seen
    }
}

/// Thread-safe in-memory store for the indexer
#[derive(Debug)]
pub struct BookStore {
    pub state: Arc<RwLock<BookState>>,
    pub markets: Arc<MarketStore>,
    pub trades: Arc<TradeStore>,
    pub decimals: Arc<DecimalsCache>,
    pub status: Arc<RwLock<SyncStatus>>,
}

impl BookStore {
    pub fn new(trade_history_cap: usize, decimals_ttl: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(BookState::new())),
            markets: Arc::new(MarketStore::new()),
            trades: Arc::new(TradeStore::new(trade_history_cap)),
            decimals: Arc::new(DecimalsCache::new(decimals_ttl)),
            status: Arc::new(RwLock::new(SyncStatus::default())),
        }
    }

    /// Open orders of a market, optionally narrowed to one maker
    pub async fn open_orders(&self, market_id: &FixedBytes<32>, maker: Option<Address>) -> Vec<Order> {
        let state = self.state.read().await;
        let mut orders = state.book().market_orders(market_id);
        if let Some(maker) = maker {
            orders.retain(|o| o.maker == maker);
        }
        orders
    }

    /// Open orders of a maker across markets
    pub async fn maker_orders(&self, maker: &Address) -> Vec<Order> {
        self.state.read().await.book().maker_orders(maker)
    }

    /// Aggregates derived on read from the book and the retained fills
    pub async fn market_stats(&self, market_id: &FixedBytes<32>) -> MarketStats {
        let (total_liquidity, active_orders) = self.state.read().await.book().market_liquidity(market_id);
        let (volume0, volume1) = self.trades.market_volume(market_id);
        MarketStats {
            total_liquidity,
            active_orders,
            volume0,
            volume1,
        }
    }

    pub async fn open_order_count(&self) -> usize {
        self.state.read().await.book().len()
    }

    pub async fn generation(&self) -> u64 {
        self.state.read().await.generation()
    }

    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }
}

impl Default for BookStore {
    fn default() -> Self {
        Self::new(
            orderbook_core::config::DEFAULT_TRADE_HISTORY_CAP,
            Duration::from_secs(3600),
        )
    }
}
