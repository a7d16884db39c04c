use async_graphql::{Enum, SimpleObject};
use orderbook_core::types::{Fill, TradeRole};

use super::formatted;

/// Side of a fill a user took part on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum GqlTradeRole {
    Maker,
    Taker,
    Either,
}

impl From<GqlTradeRole> for TradeRole {
    fn from(role: GqlTradeRole) -> Self {
        match role {
            GqlTradeRole::Maker => TradeRole::Maker,
            GqlTradeRole::Taker => TradeRole::Taker,
            GqlTradeRole::Either => TradeRole::Either,
        }
    }
}

/// GraphQL Trade type
#[derive(Debug, Clone, SimpleObject)]
pub struct GqlTrade {
    /// `{tx_hash}-{log_index}`
    pub id: String,
    pub market_id: String,
    pub order_id: String,
    pub tx_hash: String,
    pub log_index: u64,
    pub block_number: u64,
    pub taker: String,
    pub maker: Option<String>,
    pub amount0_filled: String,
    pub amount0_filled_formatted: Option<String>,
    pub amount1_spent: String,
    pub amount1_spent_formatted: Option<String>,
}

impl GqlTrade {
    pub fn new(fill: Fill, decimals0: Option<u8>, decimals1: Option<u8>) -> Self {
        Self {
            id: format!("{}-{}", fill.tx_hash(), fill.log_index()),
            market_id: fill.market_id.to_string(),
            order_id: fill.order_id.to_string(),
            tx_hash: fill.tx_hash().to_string(),
            log_index: fill.log_index(),
            block_number: fill.block_number,
            taker: fill.taker.to_checksum(None),
            maker: fill.maker.map(|m| m.to_checksum(None)),
            amount0_filled_formatted: formatted(fill.amount0_filled, decimals0),
            amount0_filled: fill.amount0_filled.to_string(),
            amount1_spent_formatted: formatted(fill.amount1_spent, decimals1),
            amount1_spent: fill.amount1_spent.to_string(),
        }
    }
}
