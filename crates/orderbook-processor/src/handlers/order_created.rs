use orderbook_core::types::{LogMeta, Order};
use orderbook_store::BookState;
use tracing::{debug, warn};

pub struct OrderCreatedHandler;

impl OrderCreatedHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, state: &mut BookState, order: &Order, meta: &LogMeta) -> bool {
        if !state.insert_order(order.clone()) {
            warn!(
                market_id = ?order.market_id,
                order_id = %order.order_id,
                tx_hash = ?meta.key.tx_hash,
                "Order id created twice, keeping the first creation"
            );
            return false;
        }

        debug!(
            market_id = ?order.market_id,
            order_id = %order.order_id,
            maker = ?order.maker,
            amount0 = %order.initial_amount0,
            block = meta.block_number,
            "Order created"
        );
        true
    }
}

impl Default for OrderCreatedHandler {
    fn default() -> Self {
        Self::new()
    }
}
