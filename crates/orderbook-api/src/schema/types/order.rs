use async_graphql::SimpleObject;
use orderbook_core::format::price_range_label;
use orderbook_core::types::Order;

use super::formatted;

/// GraphQL Order type. Amounts are raw token0 units plus a formatted copy.
#[derive(Debug, Clone, SimpleObject)]
pub struct GqlOrder {
    pub market_id: String,
    pub order_id: String,
    pub maker: String,
    pub token0: String,
    pub token1: String,
    pub initial_amount0: String,
    pub remaining_amount0: String,
    pub remaining_amount0_formatted: Option<String>,
    pub filled_amount0: String,
    pub max_price: String,
    pub min_price: String,
    /// "Market", "Market - max", "min - ∞" or "min - max"
    pub price_range: String,
    pub created_at_block: u64,
    pub created_at_tx: String,
}

impl GqlOrder {
    pub fn new(order: Order, token0_decimals: Option<u8>) -> Self {
        Self {
            market_id: order.market_id.to_string(),
            order_id: order.order_id.to_string(),
            maker: order.maker.to_checksum(None),
            token0: order.token0.to_checksum(None),
            token1: order.token1.to_checksum(None),
            initial_amount0: order.initial_amount0.to_string(),
            remaining_amount0: order.remaining_amount0.to_string(),
            remaining_amount0_formatted: formatted(order.remaining_amount0, token0_decimals),
            filled_amount0: order.filled_or_closed_amount0().to_string(),
            max_price: order.max_price.to_string(),
            min_price: order.min_price.to_string(),
            price_range: price_range_label(order.min_price, order.max_price),
            created_at_block: order.created_at_block,
            created_at_tx: order.created_at_tx.to_string(),
        }
    }
}
