use alloy_primitives::{Address, FixedBytes, B256, U256};

use super::{EventKey, OrderId, OrderKey};

/// A single fill against a resting order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    /// Unique event key (tx_hash + log_index)
    pub key: EventKey,
    pub market_id: FixedBytes<32>,
    pub order_id: OrderId,
    pub token0: Address,
    pub token1: Address,
    pub amount0_filled: U256,
    pub amount1_spent: U256,
    pub taker: Address,
    /// Maker of the filled order, when its creation has been observed
    pub maker: Option<Address>,
    pub block_number: u64,
}

impl Fill {
    pub fn order_key(&self) -> OrderKey {
        OrderKey::new(self.market_id, self.order_id)
    }

    pub fn tx_hash(&self) -> B256 {
        self.key.tx_hash
    }

    pub fn log_index(&self) -> u64 {
        self.key.log_index
    }

    /// Sort key placing the most recent fill first when sorted descending
    pub fn recency(&self) -> (u64, u64) {
        (self.block_number, self.key.log_index)
    }
}
