use alloy_primitives::{Address, FixedBytes, B256, U256};

/// Order ids are uint256 on chain, unique and monotonic within a market
pub type OrderId = U256;

/// Composite key for order lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderKey {
    pub market_id: FixedBytes<32>,
    pub order_id: OrderId,
}

impl OrderKey {
    pub fn new(market_id: FixedBytes<32>, order_id: OrderId) -> Self {
        Self {
            market_id,
            order_id,
        }
    }
}

/// A resting sell order of token0 for token1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_id: OrderId,
    pub market_id: FixedBytes<32>,
    pub maker: Address,
    pub token0: Address,
    pub token1: Address,
    /// Amount of token0 offered at creation
    pub initial_amount0: U256,
    /// Amount of token0 still offered; never exceeds `initial_amount0`
    pub remaining_amount0: U256,
    /// Zero means no upper bound
    pub max_price: U256,
    /// Zero means no lower bound
    pub min_price: U256,
    pub created_at_block: u64,
    pub created_at_tx: B256,
}

impl Order {
    pub fn key(&self) -> OrderKey {
        OrderKey::new(self.market_id, self.order_id)
    }

    /// An order stays in the open set until nothing is left to fill
    pub fn is_open(&self) -> bool {
        !self.remaining_amount0.is_zero()
    }

    pub fn filled_or_closed_amount0(&self) -> U256 {
        self.initial_amount0.saturating_sub(self.remaining_amount0)
    }
}
