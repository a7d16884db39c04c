use alloy_primitives::{Address, U256};
use orderbook_core::events::EventKind;
use orderbook_core::types::{BookEvent, DecodedLog, Fill, MarketFilter, OrderKey, TradeRole};
use orderbook_core::Result;
use orderbook_processor::{decode_logs, Snapshot};
use orderbook_store::SnapshotFold;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info};

use crate::fetcher::RangeFetcher;
use crate::source::LogQuery;

/// Order ids per `orderId` topic filter
const ORDER_ID_CHUNK: usize = 100;

/// Fetches a block range and folds it into a [`Snapshot`] without touching
/// the committed state
#[derive(Clone)]
pub struct SnapshotBuilder {
    fetcher: RangeFetcher,
    exchange: Address,
}

impl SnapshotBuilder {
    pub fn new(fetcher: RangeFetcher, exchange: Address) -> Self {
        Self { fetcher, exchange }
    }

    pub fn fetcher(&self) -> &RangeFetcher {
        &self.fetcher
    }

    fn query(&self, kind: EventKind, from_block: u64, to_block: u64) -> LogQuery {
        LogQuery::new(self.exchange, [kind], from_block, to_block)
    }

    /// Fold `[from_block, to_block]` into a snapshot.
    ///
    /// Creations, reductions and fills are independent queries; the fold does
    /// not depend on how their results interleave. Any fetch error aborts the
    /// build and nothing is returned.
    pub async fn build(&self, from_block: u64, to_block: u64, filter: &MarketFilter) -> Result<Snapshot> {
        let start = Instant::now();

        let created_q = self
            .query(EventKind::OrderCreated, from_block, to_block)
            .with_filter(filter);
        let reduced_q = self
            .query(EventKind::OrderReducedOrCancelled, from_block, to_block)
            .with_filter(filter);
        let filled_q = self
            .query(EventKind::OrderFilled, from_block, to_block)
            .with_filter(filter);
        let markets_q = self
            .query(EventKind::MarketCreated, from_block, to_block)
            .with_filter(filter);
        let feeds_q = self.query(EventKind::PriceFeedSet, from_block, to_block);

        let (created, reduced, filled, markets, feeds) = tokio::join!(
            self.fetcher.fetch(&created_q),
            self.fetcher.fetch(&reduced_q),
            self.fetcher.fetch(&filled_q),
            self.fetcher.fetch(&markets_q),
            self.fetcher.fetch(&feeds_q),
        );
        let (created, reduced, filled, markets, feeds) = (created?, reduced?, filled?, markets?, feeds?);

        debug!(
            from = from_block,
            to = to_block,
            created = created.len(),
            reduced = reduced.len(),
            filled = filled.len(),
            markets = markets.len(),
            feeds = feeds.len(),
            "Snapshot logs fetched"
        );

        let created = decode_logs(&created);
        let reduced = decode_logs(&reduced);
        let mut filled = decode_logs(&filled);

        let makers = creation_makers(&created);
        if filter.maker.is_some() {
            // fills carry no maker topic; keep only those against this maker's orders
            filled.retain(|log| match &log.event {
                BookEvent::OrderFilled(fill) => makers.contains_key(&fill.order_key()),
                _ => false,
            });
        }

        let (book, stats) = SnapshotFold::fold(created.iter().chain(&reduced).chain(&filled));
        let fills = attribute_makers(&filled, &makers);

        let markets = decode_logs(&markets)
            .into_iter()
            .filter_map(|log| match log.event {
                BookEvent::MarketCreated(market) => Some(market),
                _ => None,
            })
            .collect();
        let price_feeds = decode_logs(&feeds)
            .into_iter()
            .filter_map(|log| match log.event {
                BookEvent::PriceFeedSet(feed) => Some(feed),
                _ => None,
            })
            .collect();

        let elapsed = start.elapsed();
        orderbook_metrics::histograms::snapshot_duration(elapsed);
        info!(
            from = from_block,
            to = to_block,
            open_orders = book.len(),
            fills = fills.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Snapshot folded"
        );

        Ok(Snapshot {
            from_block,
            to_block,
            book,
            stats,
            markets,
            price_feeds,
            fills,
        })
    }

    /// Fills a user took part in over `[from_block, to_block]`, most recent first.
    ///
    /// Taker fills are matched on the `taker` topic. Maker fills need the
    /// maker's order ids first, then match on the `orderId` topic.
    pub async fn user_fills(
        &self,
        from_block: u64,
        to_block: u64,
        user: Address,
        role: TradeRole,
    ) -> Result<Vec<Fill>> {
        let mut fills = Vec::new();

        if matches!(role, TradeRole::Taker | TradeRole::Either) {
            let query = self
                .query(EventKind::OrderFilled, from_block, to_block)
                .with_taker(user);
            fills.extend(decode_logs(&self.fetcher.fetch(&query).await?));
        }

        let mut makers = HashMap::new();
        if matches!(role, TradeRole::Maker | TradeRole::Either) {
            let query = self
                .query(EventKind::OrderCreated, from_block, to_block)
                .with_filter(&MarketFilter::all().with_maker(user));
            let created = decode_logs(&self.fetcher.fetch(&query).await?);
            makers = creation_makers(&created);

            let order_ids: Vec<U256> = makers
                .keys()
                .map(|key| key.order_id)
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            for ids in order_ids.chunks(ORDER_ID_CHUNK) {
                let query = self
                    .query(EventKind::OrderFilled, from_block, to_block)
                    .with_order_ids(ids.to_vec());
                let logs = decode_logs(&self.fetcher.fetch(&query).await?);
                // order ids are only unique within a market
                fills.extend(logs.into_iter().filter(|log| match &log.event {
                    BookEvent::OrderFilled(fill) => makers.contains_key(&fill.order_key()),
                    _ => false,
                }));
            }
        }

        let mut fills = attribute_makers(&fills, &makers);
        fills.sort_by(|a, b| b.recency().cmp(&a.recency()).then(b.key.cmp(&a.key)));
        fills.dedup_by_key(|fill| fill.key);
        Ok(fills)
    }
}

/// Maker of every order created among `logs`
fn creation_makers(logs: &[DecodedLog]) -> HashMap<OrderKey, Address> {
    logs.iter()
        .filter_map(|log| match &log.event {
            BookEvent::OrderCreated(order) => Some((order.key(), order.maker)),
            _ => None,
        })
        .collect()
}

/// Fills among `logs` with the maker filled in where the creation is known
fn attribute_makers(logs: &[DecodedLog], makers: &HashMap<OrderKey, Address>) -> Vec<Fill> {
    logs.iter()
        .filter_map(|log| match &log.event {
            BookEvent::OrderFilled(fill) => Some(Fill {
                maker: fill.maker.or_else(|| makers.get(&fill.order_key()).copied()),
                ..fill.clone()
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adaptive::{AimdConfig, AimdController};
    use crate::retry::RetryPolicy;
    use crate::source::tests::{
        created_log, exchange, feed_log, filled_log, market_log, reduced_log, MockChain,
    };
    use alloy_primitives::B256;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::Duration;

    pub(crate) fn builder(chain: Arc<MockChain>) -> SnapshotBuilder {
        let controller = |name, initial| {
            AimdController::new(
                name,
                AimdConfig {
                    initial,
                    min: 1,
                    max: initial,
                    decrease_factor: 0.5,
                    increase_factor: 0.1,
                    success_threshold: 10,
                },
            )
        };
        let fetcher = RangeFetcher::with_controllers(
            chain,
            RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
            },
            Arc::new(AtomicBool::new(false)),
            controller("batch_size", 1000),
            controller("concurrency", 4),
        );
        SnapshotBuilder::new(fetcher, exchange())
    }

    fn key(market: u8, id: u64) -> OrderKey {
        OrderKey::new(B256::repeat_byte(market), U256::from(id))
    }

    #[tokio::test]
    async fn test_build_folds_all_queries() {
        let chain = Arc::new(MockChain::new(1, 100));
        chain.push(market_log(1, 1, 1, 0));
        chain.push(feed_log(0xA0, 2, 2, 0));
        // order 1: 100 - 40 filled - 60 reduced = closed
        chain.push(created_log(1, 1, 7, 100, 10, 3, 0));
        chain.push(filled_log(1, 1, 40, 9, 11, 4, 0));
        chain.push(reduced_log(1, 1, 7, 60, 12, 5, 0));
        // order 2 stays open
        chain.push(created_log(1, 2, 8, 50, 13, 6, 0));
        chain.push(filled_log(1, 2, 5, 9, 14, 7, 0));

        let snapshot = builder(chain)
            .build(0, 100, &MarketFilter::all())
            .await
            .unwrap();

        assert_eq!(snapshot.to_block, 100);
        assert_eq!(snapshot.book.len(), 1);
        assert!(!snapshot.book.contains(&key(1, 1)));
        assert_eq!(
            snapshot.book.get(&key(1, 2)).unwrap().remaining_amount0,
            U256::from(45u64)
        );
        assert_eq!(snapshot.stats.closed, 1);
        assert_eq!(snapshot.markets.len(), 1);
        assert_eq!(snapshot.price_feeds.len(), 1);

        // maker attributed even though order 1 no longer exists
        assert_eq!(snapshot.fills.len(), 2);
        let closed_fill = snapshot.fills.iter().find(|f| f.order_id == U256::from(1u64)).unwrap();
        assert_eq!(closed_fill.maker, Some(Address::with_last_byte(7)));
    }

    #[tokio::test]
    async fn test_build_respects_filter() {
        let chain = Arc::new(MockChain::new(1, 100));
        chain.push(market_log(1, 1, 1, 0));
        chain.push(market_log(2, 1, 1, 1));
        chain.push(created_log(1, 1, 7, 100, 10, 2, 0));
        chain.push(created_log(1, 2, 8, 100, 10, 2, 1));
        chain.push(created_log(2, 1, 7, 100, 10, 2, 2));
        chain.push(filled_log(1, 2, 10, 9, 11, 3, 0));
        chain.push(filled_log(1, 1, 10, 9, 11, 3, 1));

        let filter = MarketFilter::markets(vec![B256::repeat_byte(1)]).with_maker(Address::with_last_byte(7));
        let snapshot = builder(chain).build(0, 100, &filter).await.unwrap();

        assert_eq!(snapshot.book.len(), 1);
        assert_eq!(
            snapshot.book.get(&key(1, 1)).unwrap().remaining_amount0,
            U256::from(90u64)
        );
        assert_eq!(snapshot.markets.len(), 1);
        // the fill against maker 8's order is dropped, not counted as unknown
        assert_eq!(snapshot.fills.len(), 1);
        assert_eq!(snapshot.stats.unknown_orders, 0);
    }

    #[tokio::test]
    async fn test_build_error_returns_nothing() {
        let chain = Arc::new(MockChain::new(1, 100));
        chain.push(created_log(1, 1, 7, 100, 10, 2, 0));
        chain.fail_next("execution reverted");
        assert!(builder(chain)
            .build(0, 100, &MarketFilter::all())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_user_fills_by_role() {
        let chain = Arc::new(MockChain::new(1, 100));
        let user = Address::with_last_byte(7);
        // user made order (1,1); someone else made (2,1) with the same id
        chain.push(created_log(1, 1, 7, 100, 10, 1, 0));
        chain.push(created_log(2, 1, 8, 100, 10, 1, 1));
        chain.push(filled_log(1, 1, 10, 9, 11, 2, 0));
        chain.push(filled_log(2, 1, 10, 9, 11, 2, 1));
        // user took from order (2,1)
        chain.push(filled_log(2, 1, 5, 7, 12, 3, 0));

        let builder = builder(chain);
        let as_maker = builder.user_fills(0, 100, user, TradeRole::Maker).await.unwrap();
        assert_eq!(as_maker.len(), 1);
        assert_eq!(as_maker[0].maker, Some(user));

        let as_taker = builder.user_fills(0, 100, user, TradeRole::Taker).await.unwrap();
        assert_eq!(as_taker.len(), 1);
        assert_eq!(as_taker[0].taker, user);

        let either = builder.user_fills(0, 100, user, TradeRole::Either).await.unwrap();
        assert_eq!(either.len(), 2);
        assert!(either[0].block_number >= either[1].block_number);
    }
}
