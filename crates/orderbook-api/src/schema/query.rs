use alloy_primitives::{hex, Address, Bytes, U256};
use async_graphql::{Context, Object, Result};
use orderbook_core::calls::{needs_approval, CreateOrderArgs, FillOrderArgs, OrderCalls};
use orderbook_core::format::{parse_amount, PRICE_DECIMALS};
use orderbook_core::types::{Market, OrderKey};
use orderbook_oracle::PriceUpdateClient;
use orderbook_store::BookStore;
use orderbook_sync::{TokenReader, TradeLookup};
use std::sync::Arc;
use tracing::warn;

use super::parse;
use super::types::{
    GqlAllowance, GqlCallRequest, GqlMarket, GqlMarketStats, GqlOrder, GqlPriceFeed,
    GqlPriceUpdate, GqlSyncStatus, GqlTrade, GqlTradeRole,
};
use crate::ApiError;

const MAX_LIMIT: usize = 500;

/// Root query type
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Health check
    async fn health(&self) -> &'static str {
        "ok"
    }

    /// All discovered markets
    async fn markets(&self, ctx: &Context<'_>) -> Result<Vec<GqlMarket>> {
        let store = ctx.data::<Arc<BookStore>>()?;
        let mut markets = store.markets.get_all();
        markets.sort_by_key(|m| (m.created_at_block, m.market_id));
        Ok(markets
            .into_iter()
            .map(|m| market_with_decimals(store, m))
            .collect())
    }

    /// Get a market by ID
    async fn market(&self, ctx: &Context<'_>, id: String) -> Result<Option<GqlMarket>> {
        let store = ctx.data::<Arc<BookStore>>()?;
        let market_id = parse::bytes32(&id)?;
        Ok(store
            .markets
            .get(&market_id)
            .map(|m| market_with_decimals(store, m)))
    }

    /// Liquidity and retained volume of a market
    async fn market_stats(&self, ctx: &Context<'_>, market_id: String) -> Result<GqlMarketStats> {
        let store = ctx.data::<Arc<BookStore>>()?;
        let id = parse::bytes32(&market_id)?;
        let market = store
            .markets
            .get(&id)
            .ok_or_else(|| ApiError::NotFound(format!("market {market_id}")))?;

        let stats = store.market_stats(&id).await;
        Ok(GqlMarketStats::new(
            id.to_string(),
            stats,
            store.decimals.get(&market.token0),
            store.decimals.get(&market.token1),
        ))
    }

    /// Open orders of a market, optionally for one maker
    async fn open_orders(
        &self,
        ctx: &Context<'_>,
        market_id: String,
        maker: Option<String>,
    ) -> Result<Vec<GqlOrder>> {
        let store = ctx.data::<Arc<BookStore>>()?;
        let id = parse::bytes32(&market_id)?;
        let maker = maker.as_deref().map(parse::address).transpose()?;

        let orders = store.open_orders(&id, maker).await;
        Ok(orders
            .into_iter()
            .map(|o| {
                let decimals = store.decimals.get(&o.token0);
                GqlOrder::new(o, decimals)
            })
            .collect())
    }

    /// Open orders of a maker across all markets
    async fn maker_orders(&self, ctx: &Context<'_>, maker: String) -> Result<Vec<GqlOrder>> {
        let store = ctx.data::<Arc<BookStore>>()?;
        let maker = parse::address(&maker)?;

        let orders = store.maker_orders(&maker).await;
        Ok(orders
            .into_iter()
            .map(|o| {
                let decimals = store.decimals.get(&o.token0);
                GqlOrder::new(o, decimals)
            })
            .collect())
    }

    /// Most recent fills of a market, newest first
    async fn market_trades(
        &self,
        ctx: &Context<'_>,
        market_id: String,
        #[graphql(default = 50)] limit: i32,
    ) -> Result<Vec<GqlTrade>> {
        let store = ctx.data::<Arc<BookStore>>()?;
        let id = parse::bytes32(&market_id)?;

        let fills = store
            .trades
            .market_trades(&id, parse::limit(limit, MAX_LIMIT));
        Ok(fills.into_iter().map(|f| trade_with_decimals(store, f)).collect())
    }

    /// Most recent fills a user took part in, newest first
    async fn user_trades(
        &self,
        ctx: &Context<'_>,
        user: String,
        #[graphql(default_with = "GqlTradeRole::Either")] role: GqlTradeRole,
        #[graphql(default = 50)] limit: i32,
    ) -> Result<Vec<GqlTrade>> {
        let store = ctx.data::<Arc<BookStore>>()?;
        let user = parse::address(&user)?;

        let role = role.into();
        let limit = parse::limit(limit, MAX_LIMIT);

        let mut fills = store.trades.user_trades(&user, role, limit);
        if let Some(history) = ctx.data::<Option<TradeLookup>>()? {
            match history.user_trades(fills.clone(), user, role, limit).await {
                Ok(merged) => fills = merged,
                Err(e) => warn!(user = %user, error = %e, "Chain backfill of user trades failed"),
            }
        }
        Ok(fills.into_iter().map(|f| trade_with_decimals(store, f)).collect())
    }

    /// Oracle feed registrations per token
    async fn price_feeds(&self, ctx: &Context<'_>) -> Result<Vec<GqlPriceFeed>> {
        let store = ctx.data::<Arc<BookStore>>()?;
        let mut feeds = store.markets.price_feeds();
        feeds.sort_by_key(|f| f.token);
        Ok(feeds.into_iter().map(GqlPriceFeed::from).collect())
    }

    /// Sync progress and last error
    async fn sync_status(&self, ctx: &Context<'_>) -> Result<GqlSyncStatus> {
        let store = ctx.data::<Arc<BookStore>>()?;
        let status = store.status().await;
        let (generation, open_orders) = {
            let state = store.state.read().await;
            (state.generation(), state.book().len())
        };
        Ok(GqlSyncStatus::new(
            status,
            generation,
            open_orders,
            store.markets.count(),
        ))
    }

    /// Latest oracle update payloads for the feeds registered to `tokens`
    async fn price_update_data(
        &self,
        ctx: &Context<'_>,
        tokens: Vec<String>,
    ) -> Result<GqlPriceUpdate> {
        let store = ctx.data::<Arc<BookStore>>()?;
        let oracle = ctx
            .data::<Option<PriceUpdateClient>>()?
            .as_ref()
            .ok_or_else(|| ApiError::Unavailable("no price service configured".to_string()))?;

        let mut feed_ids = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let token = parse::address(token)?;
            let feed = store.markets.price_feed(&token).ok_or_else(|| {
                ApiError::NotFound(format!("price feed for {}", token.to_checksum(None)))
            })?;
            if !feed_ids.contains(&feed.price_feed_id) {
                feed_ids.push(feed.price_feed_id);
            }
        }

        let update = oracle.latest(&feed_ids).await?;
        Ok(update.into())
    }

    /// Calldata for `createOrder`. Amounts are human decimals; prices use 18 decimals
    /// and an empty or missing bound means unbounded.
    #[allow(clippy::too_many_arguments)]
    async fn create_order_call(
        &self,
        ctx: &Context<'_>,
        token0: String,
        token1: String,
        amount0: String,
        max_price: Option<String>,
        min_price: Option<String>,
        #[graphql(default)] price_update_data: Vec<String>,
        update_fee: Option<String>,
    ) -> Result<GqlCallRequest> {
        let calls = ctx.data::<OrderCalls>()?;
        let token0 = parse::address(&token0)?;
        let token1 = parse::address(&token1)?;
        let decimals0 = token_decimals(ctx, token0).await?;

        let args = CreateOrderArgs {
            token0,
            token1,
            amount0: parse_amount(&amount0, decimals0)?,
            max_price: price_bound(max_price.as_deref())?,
            min_price: price_bound(min_price.as_deref())?,
            price_update_data: payloads(&price_update_data)?,
            update_fee: wei(update_fee.as_deref())?,
        };
        Ok(calls.create_order(args).into())
    }

    /// Calldata for `cancelOrReduceOrder`. Without `amount0Close` the whole
    /// remaining amount is closed.
    async fn cancel_or_reduce_call(
        &self,
        ctx: &Context<'_>,
        market_id: String,
        order_id: String,
        amount0_close: Option<String>,
    ) -> Result<GqlCallRequest> {
        let store = ctx.data::<Arc<BookStore>>()?;
        let calls = ctx.data::<OrderCalls>()?;
        let market_id = parse::bytes32(&market_id)?;
        let order_id = parse::uint(&order_id)?;

        let key = OrderKey::new(market_id, order_id);
        let order = store
            .state
            .read()
            .await
            .book()
            .get(&key)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("open order {order_id}")))?;

        let amount = match amount0_close {
            Some(amount) => {
                let decimals0 = token_decimals(ctx, order.token0).await?;
                parse_amount(&amount, decimals0)?
            }
            None => order.remaining_amount0,
        };
        Ok(calls.cancel_or_reduce(market_id, order_id, amount).into())
    }

    /// Calldata for `fillOrderExactAmountIn`. `amount1In` and `minAmount0Out`
    /// are human decimals of the market's tokens.
    #[allow(clippy::too_many_arguments)]
    async fn fill_order_call(
        &self,
        ctx: &Context<'_>,
        market_id: String,
        order_id: String,
        amount1_in: String,
        #[graphql(default_with = "\"0\".to_string()")] min_amount0_out: String,
        #[graphql(default)] price_update_data: Vec<String>,
        update_fee: Option<String>,
    ) -> Result<GqlCallRequest> {
        let store = ctx.data::<Arc<BookStore>>()?;
        let calls = ctx.data::<OrderCalls>()?;
        let id = parse::bytes32(&market_id)?;
        let market = store
            .markets
            .get(&id)
            .ok_or_else(|| ApiError::NotFound(format!("market {market_id}")))?;

        let decimals0 = token_decimals(ctx, market.token0).await?;
        let decimals1 = token_decimals(ctx, market.token1).await?;

        let args = FillOrderArgs {
            market_id: id,
            order_id: parse::uint(&order_id)?,
            amount1_in: parse_amount(&amount1_in, decimals1)?,
            min_amount0_out: parse_amount(&min_amount0_out, decimals0)?,
            price_update_data: payloads(&price_update_data)?,
            update_fee: wei(update_fee.as_deref())?,
        };
        Ok(calls.fill_exact_amount_in(args).into())
    }

    /// ERC-20 approval of `amount` (human decimals) to the exchange
    async fn approve_call(
        &self,
        ctx: &Context<'_>,
        token: String,
        amount: String,
    ) -> Result<GqlCallRequest> {
        let calls = ctx.data::<OrderCalls>()?;
        let token = parse::address(&token)?;
        let decimals = token_decimals(ctx, token).await?;
        Ok(calls.approve(token, parse_amount(&amount, decimals)?).into())
    }

    /// Allowance the exchange holds from `owner`, compared against `amount`
    async fn allowance(
        &self,
        ctx: &Context<'_>,
        token: String,
        owner: String,
        amount: String,
    ) -> Result<GqlAllowance> {
        let calls = ctx.data::<OrderCalls>()?;
        let reader = token_reader(ctx)?;
        let token = parse::address(&token)?;
        let owner = parse::address(&owner)?;

        let decimals = token_decimals(ctx, token).await?;
        let amount = parse_amount(&amount, decimals)?;
        let allowance = reader.allowance(token, owner).await?;

        let needs = needs_approval(allowance, amount);
        Ok(GqlAllowance {
            allowance: allowance.to_string(),
            needs_approval: needs,
            approve: needs.then(|| calls.approve(token, amount).into()),
        })
    }
}

fn market_with_decimals(store: &BookStore, market: Market) -> GqlMarket {
    let decimals0 = store.decimals.get(&market.token0);
    let decimals1 = store.decimals.get(&market.token1);
    GqlMarket::new(market, decimals0, decimals1)
}

fn trade_with_decimals(store: &BookStore, fill: orderbook_core::types::Fill) -> GqlTrade {
    let decimals0 = store.decimals.get(&fill.token0);
    let decimals1 = store.decimals.get(&fill.token1);
    GqlTrade::new(fill, decimals0, decimals1)
}

fn token_reader<'a>(ctx: &'a Context<'_>) -> Result<&'a TokenReader> {
    Ok(ctx
        .data::<Option<TokenReader>>()?
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("no chain connection".to_string()))?)
}

/// Cached decimals, read from chain on a miss
async fn token_decimals(ctx: &Context<'_>, token: Address) -> Result<u8> {
    let store = ctx.data::<Arc<BookStore>>()?;
    if let Some(decimals) = store.decimals.get(&token) {
        return Ok(decimals);
    }
    Ok(token_reader(ctx)?.decimals(token).await?)
}

fn price_bound(input: Option<&str>) -> Result<U256, ApiError> {
    match input.map(str::trim) {
        None | Some("") => Ok(U256::ZERO),
        Some(price) => {
            parse_amount(price, PRICE_DECIMALS).map_err(|e| ApiError::InvalidInput(e.to_string()))
        }
    }
}

fn wei(input: Option<&str>) -> Result<U256, ApiError> {
    match input.map(str::trim) {
        None | Some("") => Ok(U256::ZERO),
        Some(value) => parse::uint(value),
    }
}

fn payloads(inputs: &[String]) -> Result<Vec<Bytes>, ApiError> {
    inputs
        .iter()
        .map(|payload| {
            hex::decode(payload.trim())
                .map(Bytes::from)
                .map_err(|_| ApiError::InvalidInput(format!("not hex: {payload}")))
        })
        .collect()
}
