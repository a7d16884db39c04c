use orderbook_core::types::PriceFeed;
use orderbook_store::BookStore;
use std::sync::Arc;
use tracing::info;

pub struct PriceFeedSetHandler {
    store: Arc<BookStore>,
}

impl PriceFeedSetHandler {
    pub fn new(store: Arc<BookStore>) -> Self {
        Self { store }
    }

    pub fn handle(&self, feed: &PriceFeed) {
        info!(
            token = ?feed.token,
            feed_id = ?feed.price_feed_id,
            block = feed.set_at_block,
            "Price feed set"
        );
        self.store.markets.set_price_feed(feed.clone());
    }
}
