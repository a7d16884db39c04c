use alloy_primitives::{Address, FixedBytes};
use dashmap::{mapref::entry::Entry, DashMap};
use orderbook_core::types::{Market, PriceFeed};
use tracing::debug;

/// Thread-safe registry of listed markets and configured price feeds
#[derive(Debug, Default)]
pub struct MarketStore {
    /// Market ID -> Market
    markets: DashMap<FixedBytes<32>, Market>,
    /// Token -> price feed (last write wins)
    price_feeds: DashMap<Address, PriceFeed>,
}

impl MarketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a market. Markets are immutable, so an existing entry is kept.
    /// Returns true if the market is new.
    pub fn insert(&self, market: Market) -> bool {
        let market_id = market.market_id;
        let inserted = match self.markets.entry(market_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(market);
                true
            }
        };

        if inserted {
            debug!(
                market_id = ?market_id,
                total_markets = self.markets.len(),
                "Market inserted into memory store"
            );
        }
        inserted
    }

    /// Bulk insert markets, returning how many were new
    pub fn bulk_insert(&self, markets: impl IntoIterator<Item = Market>) -> usize {
        markets.into_iter().map(|m| self.insert(m)).filter(|new| *new).count()
    }

    pub fn get(&self, market_id: &FixedBytes<32>) -> Option<Market> {
        self.markets.get(market_id).map(|m| m.clone())
    }

    pub fn contains(&self, market_id: &FixedBytes<32>) -> bool {
        self.markets.contains_key(market_id)
    }

    /// All markets ordered by creation block
    pub fn get_all(&self) -> Vec<Market> {
        let mut markets: Vec<Market> = self.markets.iter().map(|e| e.value().clone()).collect();
        markets.sort_by_key(|m| (m.created_at_block, m.market_id));
        markets
    }

    /// Distinct tokens across every known market
    pub fn tokens(&self) -> Vec<Address> {
        let mut tokens: Vec<Address> = self
            .markets
            .iter()
            .flat_map(|e| [e.token0, e.token1])
            .collect();
        tokens.sort();
        tokens.dedup();
        tokens
    }

    pub fn count(&self) -> usize {
        self.markets.len()
    }

    /// Record a price feed; a later block replaces an earlier one
    pub fn set_price_feed(&self, feed: PriceFeed) {
        let token = feed.token;
        self.price_feeds
            .entry(token)
            .and_modify(|current| {
                if feed.set_at_block >= current.set_at_block {
                    *current = feed.clone();
                }
            })
            .or_insert_with(|| feed.clone());
        debug!(token = ?token, feed_id = ?feed.price_feed_id, "Price feed recorded");
    }

    pub fn price_feed(&self, token: &Address) -> Option<PriceFeed> {
        self.price_feeds.get(token).map(|f| f.clone())
    }

    pub fn price_feeds(&self) -> Vec<PriceFeed> {
        let mut feeds: Vec<PriceFeed> = self.price_feeds.iter().map(|e| e.value().clone()).collect();
        feeds.sort_by_key(|f| f.token);
        feeds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;

    fn market(id: u8, block: u64) -> Market {
        Market {
            market_id: FixedBytes::repeat_byte(id),
            token0: Address::with_last_byte(id),
            token1: Address::with_last_byte(0xFF),
            created_at_block: block,
            created_at_tx: B256::ZERO,
        }
    }

    fn feed(token: u8, id: u8, block: u64) -> PriceFeed {
        PriceFeed {
            token: Address::with_last_byte(token),
            price_feed_id: B256::repeat_byte(id),
            owner: Address::ZERO,
            set_at_block: block,
        }
    }

    #[test]
    fn test_market_insert_keeps_first() {
        let store = MarketStore::new();
        assert!(store.insert(market(1, 10)));
        assert!(!store.insert(market(1, 99)));
        assert_eq!(store.get(&FixedBytes::repeat_byte(1)).unwrap().created_at_block, 10);
        assert_eq!(store.bulk_insert([market(2, 5), market(1, 10)]), 1);

        let all = store.get_all();
        assert_eq!(all[0].market_id, FixedBytes::repeat_byte(2));
        assert_eq!(store.tokens().len(), 3);
    }

    #[test]
    fn test_price_feed_last_write_wins() {
        let store = MarketStore::new();
        store.set_price_feed(feed(1, 1, 10));
        store.set_price_feed(feed(1, 2, 20));
        store.set_price_feed(feed(1, 3, 15));
        assert_eq!(
            store.price_feed(&Address::with_last_byte(1)).unwrap().price_feed_id,
            B256::repeat_byte(2)
        );
        assert_eq!(store.price_feeds().len(), 1);
    }
}
