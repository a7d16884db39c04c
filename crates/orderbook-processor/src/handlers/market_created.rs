use orderbook_core::types::Market;
use orderbook_store::BookStore;
use std::sync::Arc;
use tracing::info;

pub struct MarketCreatedHandler {
    store: Arc<BookStore>,
}

impl MarketCreatedHandler {
    pub fn new(store: Arc<BookStore>) -> Self {
        Self { store }
    }

    /// Returns true if the market was not known yet
    pub fn handle(&self, market: &Market) -> bool {
        let is_new = self.store.markets.insert(market.clone());
        if is_new {
            orderbook_metrics::counters::markets_discovered(1);
            info!(
                market_id = ?market.market_id,
                token0 = ?market.token0,
                token1 = ?market.token1,
                block = market.created_at_block,
                "New market discovered"
            );
        }
        is_new
    }
}
