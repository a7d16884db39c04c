use alloy_primitives::{Address, FixedBytes, B256, U256};

use super::{Fill, Market, Order, OrderId, OrderKey, PriceFeed};
use crate::events::EventKind;

/// Unique identity of a log (tx_hash + log_index).
/// The same event seen by the historical fetch and the live stream has the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventKey {
    pub tx_hash: B256,
    pub log_index: u64,
}

impl EventKey {
    pub fn new(tx_hash: B256, log_index: u64) -> Self {
        Self { tx_hash, log_index }
    }
}

/// Chain position of a decoded log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogMeta {
    pub key: EventKey,
    pub block_number: u64,
    pub address: Address,
}

impl LogMeta {
    /// Chain order: block first, then position in block
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.key.log_index)
    }
}

/// Amount of token0 removed from an order by a reduction or cancellation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDelta {
    pub market_id: FixedBytes<32>,
    pub order_id: OrderId,
    pub maker: Address,
    pub amount0: U256,
}

/// Exchange event in domain form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookEvent {
    MarketCreated(Market),
    OrderCreated(Order),
    OrderReduced(OrderDelta),
    OrderFilled(Fill),
    PriceFeedSet(PriceFeed),
}

impl BookEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::MarketCreated(_) => EventKind::MarketCreated,
            Self::OrderCreated(_) => EventKind::OrderCreated,
            Self::OrderReduced(_) => EventKind::OrderReducedOrCancelled,
            Self::OrderFilled(_) => EventKind::OrderFilled,
            Self::PriceFeedSet(_) => EventKind::PriceFeedSet,
        }
    }

    /// Order touched and token0 removed, for reductions and fills
    pub fn order_delta(&self) -> Option<(OrderKey, U256)> {
        match self {
            Self::OrderReduced(delta) => Some((
                OrderKey::new(delta.market_id, delta.order_id),
                delta.amount0,
            )),
            Self::OrderFilled(fill) => Some((fill.order_key(), fill.amount0_filled)),
            _ => None,
        }
    }

    pub fn market_id(&self) -> Option<FixedBytes<32>> {
        match self {
            Self::MarketCreated(market) => Some(market.market_id),
            Self::OrderCreated(order) => Some(order.market_id),
            Self::OrderReduced(delta) => Some(delta.market_id),
            Self::OrderFilled(fill) => Some(fill.market_id),
            Self::PriceFeedSet(_) => None,
        }
    }
}

/// A log that decoded cleanly, with its chain position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLog {
    pub meta: LogMeta,
    pub event: BookEvent,
}

impl DecodedLog {
    pub fn key(&self) -> EventKey {
        self.meta.key
    }

    pub fn block_number(&self) -> u64 {
        self.meta.block_number
    }
}
