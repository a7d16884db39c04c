use alloy_primitives::FixedBytes;
use async_graphql::{ComplexObject, Context, Result, SimpleObject};
use orderbook_core::types::{Market, MarketStats, PriceFeed};
use orderbook_store::BookStore;
use std::sync::Arc;

use super::formatted;

/// GraphQL Market type
#[derive(Debug, Clone, SimpleObject)]
#[graphql(complex)]
pub struct GqlMarket {
    #[graphql(skip)]
    pub market_id: FixedBytes<32>,
    pub id: String,
    pub token0: String,
    pub token1: String,
    pub token0_decimals: Option<u8>,
    pub token1_decimals: Option<u8>,
    pub created_at_block: u64,
    pub created_at_tx: String,
}

impl GqlMarket {
    pub fn new(market: Market, token0_decimals: Option<u8>, token1_decimals: Option<u8>) -> Self {
        Self {
            market_id: market.market_id,
            id: market.market_id.to_string(),
            token0: market.token0.to_checksum(None),
            token1: market.token1.to_checksum(None),
            token0_decimals,
            token1_decimals,
            created_at_block: market.created_at_block,
            created_at_tx: market.created_at_tx.to_string(),
        }
    }
}

#[ComplexObject]
impl GqlMarket {
    /// Liquidity from the open book and volume from the retained fills
    async fn stats(&self, ctx: &Context<'_>) -> Result<GqlMarketStats> {
        let store = ctx.data::<Arc<BookStore>>()?;
        let stats = store.market_stats(&self.market_id).await;
        Ok(GqlMarketStats::new(
            self.id.clone(),
            stats,
            self.token0_decimals,
            self.token1_decimals,
        ))
    }
}

/// Aggregates for one market
#[derive(Debug, Clone, SimpleObject)]
pub struct GqlMarketStats {
    pub market_id: String,
    pub total_liquidity: String,
    pub total_liquidity_formatted: Option<String>,
    pub active_orders: u64,
    pub volume0: String,
    pub volume0_formatted: Option<String>,
    pub volume1: String,
    pub volume1_formatted: Option<String>,
}

impl GqlMarketStats {
    pub fn new(market_id: String, stats: MarketStats, decimals0: Option<u8>, decimals1: Option<u8>) -> Self {
        Self {
            market_id,
            total_liquidity_formatted: formatted(stats.total_liquidity, decimals0),
            total_liquidity: stats.total_liquidity.to_string(),
            active_orders: stats.active_orders as u64,
            volume0_formatted: formatted(stats.volume0, decimals0),
            volume0: stats.volume0.to_string(),
            volume1_formatted: formatted(stats.volume1, decimals1),
            volume1: stats.volume1.to_string(),
        }
    }
}

/// GraphQL PriceFeed type
#[derive(Debug, Clone, SimpleObject)]
pub struct GqlPriceFeed {
    pub token: String,
    pub price_feed_id: String,
    pub owner: String,
    pub set_at_block: u64,
}

impl From<PriceFeed> for GqlPriceFeed {
    fn from(feed: PriceFeed) -> Self {
        Self {
            token: feed.token.to_checksum(None),
            price_feed_id: feed.price_feed_id.to_string(),
            owner: feed.owner.to_checksum(None),
            set_at_block: feed.set_at_block,
        }
    }
}
