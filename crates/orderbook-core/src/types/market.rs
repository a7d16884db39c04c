use alloy_primitives::{Address, FixedBytes, B256, U256};

/// A listed token pair. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Market {
    pub market_id: FixedBytes<32>,
    pub token0: Address,
    pub token1: Address,
    pub created_at_block: u64,
    pub created_at_tx: B256,
}

/// Aggregates derived from the open-order map and the retained fills
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketStats {
    /// Sum of `remaining_amount0` over open orders
    pub total_liquidity: U256,
    pub active_orders: usize,
    /// token0 traded across retained fills
    pub volume0: U256,
    /// token1 spent across retained fills
    pub volume1: U256,
}

/// Oracle feed configured for a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceFeed {
    pub token: Address,
    pub price_feed_id: B256,
    pub owner: Address,
    pub set_at_block: u64,
}
