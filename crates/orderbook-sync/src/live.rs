use alloy_primitives::Address;
use futures::future::try_join_all;
use orderbook_core::events::EventKind;
use orderbook_core::types::MarketFilter;
use orderbook_core::{IndexerError, Result};
use orderbook_processor::{decode_logs, BatchOutcome, EventProcessor, LiveBatch};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::fetcher::RangeFetcher;
use crate::source::LogQuery;

/// Result of one live poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No cutover yet, or the cursor is past the head
    Idle,
    Batch {
        outcome: BatchOutcome,
        /// Blocks still between the batch end and the head
        behind: u64,
    },
}

/// Polls new blocks past the live cursor and hands them to the processor
pub struct LiveWatcher {
    fetcher: RangeFetcher,
    processor: Arc<EventProcessor>,
    exchange: Address,
    filter: MarketFilter,
    poll_interval: Duration,
    max_block_span: u64,
}

impl LiveWatcher {
    pub fn new(
        fetcher: RangeFetcher,
        processor: Arc<EventProcessor>,
        exchange: Address,
        filter: MarketFilter,
        poll_interval: Duration,
        max_block_span: u64,
    ) -> Self {
        Self {
            fetcher,
            processor,
            exchange,
            filter,
            poll_interval,
            max_block_span: max_block_span.max(1),
        }
    }

    fn queries(&self, from_block: u64, to_block: u64) -> Vec<LogQuery> {
        if self.filter == MarketFilter::all() {
            return vec![LogQuery::new(self.exchange, EventKind::ALL, from_block, to_block)];
        }
        EventKind::ALL
            .into_iter()
            .map(|kind| LogQuery::new(self.exchange, [kind], from_block, to_block).with_filter(&self.filter))
            .collect()
    }

    /// Fetch `[cursor, min(head, cursor + span - 1)]` and apply it.
    ///
    /// The generation is read before fetching, so a resync that commits while
    /// the request is in flight makes the processor drop the batch.
    pub async fn poll_once(&self) -> Result<PollOutcome> {
        let (generation, cursor) = {
            let state = self.processor.store().state.read().await;
            (state.generation(), state.live_cursor())
        };
        let Some(from_block) = cursor else {
            return Ok(PollOutcome::Idle);
        };

        let head = self.fetcher.source().head_block().await?;
        if head < from_block {
            return Ok(PollOutcome::Idle);
        }
        let to_block = head.min(from_block.saturating_add(self.max_block_span - 1));

        let fetches = self
            .queries(from_block, to_block)
            .into_iter()
            .map(|query| async move { self.fetcher.fetch(&query).await });
        let logs: Vec<_> = try_join_all(fetches).await?.into_iter().flatten().collect();
        let events = decode_logs(&logs);

        debug!(
            from = from_block,
            to = to_block,
            head = head,
            events = events.len(),
            generation = generation,
            "Live poll fetched"
        );

        let outcome = self
            .processor
            .apply_live_batch(LiveBatch {
                generation,
                from_block,
                to_block,
                events,
            })
            .await;

        Ok(PollOutcome::Batch {
            outcome,
            behind: head - to_block,
        })
    }

    /// Poll on every tick until shutdown. A lagging cursor is caught up
    /// without waiting for the next tick.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            max_block_span = self.max_block_span,
            "Live watcher started"
        );

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = interval.tick() => {
                    if !self.catch_up().await {
                        break;
                    }
                }
            }
        }

        info!("Live watcher stopped");
    }

    /// Returns false once shutdown has begun
    async fn catch_up(&self) -> bool {
        loop {
            if self.processor.is_shutting_down() {
                return false;
            }
            match self.poll_once().await {
                Ok(PollOutcome::Batch {
                    outcome: BatchOutcome::Applied { .. },
                    behind,
                }) if behind > 0 => continue,
                Ok(PollOutcome::Batch {
                    outcome: BatchOutcome::ShuttingDown,
                    ..
                })
                | Err(IndexerError::Shutdown) => return false,
                Ok(_) => return true,
                Err(e) => {
                    warn!(error = %e, "Live poll failed");
                    orderbook_metrics::counters::errors(1, "live_poll");
                    self.processor.store().status.write().await.set_error(e.to_string());
                    return true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::builder;
    use crate::source::tests::{created_log, exchange, filled_log, market_log, MockChain};
    use alloy_primitives::{B256, U256};
    use orderbook_core::types::OrderKey;
    use orderbook_processor::CommitOutcome;
    use orderbook_store::BookStore;
    use std::sync::atomic::AtomicBool;

    struct Harness {
        chain: Arc<MockChain>,
        store: Arc<BookStore>,
        processor: Arc<EventProcessor>,
        watcher: LiveWatcher,
    }

    fn harness(filter: MarketFilter, span: u64) -> Harness {
        let chain = Arc::new(MockChain::new(1, 0));
        let store = Arc::new(BookStore::default());
        let processor = Arc::new(EventProcessor::new(store.clone(), Arc::new(AtomicBool::new(false))));
        let watcher = LiveWatcher::new(
            builder(chain.clone()).fetcher().clone(),
            processor.clone(),
            exchange(),
            filter,
            Duration::from_millis(10),
            span,
        );
        Harness {
            chain,
            store,
            processor,
            watcher,
        }
    }

    async fn commit(h: &Harness, to_block: u64) {
        let snapshot = builder(h.chain.clone())
            .build(0, to_block, &MarketFilter::all())
            .await
            .unwrap();
        assert!(matches!(
            h.processor.commit_snapshot(snapshot).await,
            CommitOutcome::Committed { .. }
        ));
    }

    #[tokio::test]
    async fn test_idle_before_cutover() {
        let h = harness(MarketFilter::all(), 100);
        h.chain.set_head(50);
        h.chain.push(created_log(1, 1, 2, 100, 10, 1, 0));
        assert_eq!(h.watcher.poll_once().await.unwrap(), PollOutcome::Idle);
        assert_eq!(h.store.open_order_count().await, 0);
    }

    #[tokio::test]
    async fn test_polls_from_cursor_in_spans() {
        let h = harness(MarketFilter::all(), 10);
        h.chain.push(created_log(1, 1, 2, 100, 5, 1, 0));
        h.chain.set_head(20);
        commit(&h, 20).await;

        h.chain.push(filled_log(1, 1, 30, 9, 21, 2, 0));
        h.chain.push(created_log(1, 2, 2, 100, 35, 3, 0));
        h.chain.set_head(40);

        let first = h.watcher.poll_once().await.unwrap();
        assert_eq!(
            first,
            PollOutcome::Batch {
                outcome: BatchOutcome::Applied { applied: 1, discarded: 0 },
                behind: 10
            }
        );
        assert_eq!(h.store.state.read().await.live_cursor(), Some(31));

        assert!(h.watcher.catch_up().await);
        let state = h.store.state.read().await;
        assert_eq!(state.live_cursor(), Some(41));
        assert_eq!(state.book().len(), 2);
        assert_eq!(
            state
                .book()
                .get(&OrderKey::new(B256::repeat_byte(1), U256::from(1u64)))
                .unwrap()
                .remaining_amount0,
            U256::from(70u64)
        );
    }

    #[tokio::test]
    async fn test_filtered_markets_only() {
        let h = harness(MarketFilter::markets(vec![B256::repeat_byte(1)]), 100);
        h.chain.set_head(10);
        commit(&h, 10).await;

        h.chain.push(market_log(2, 11, 1, 0));
        h.chain.push(created_log(2, 1, 2, 100, 11, 1, 1));
        h.chain.push(created_log(1, 1, 2, 100, 12, 2, 0));
        h.chain.set_head(12);

        h.watcher.poll_once().await.unwrap();
        assert_eq!(h.store.open_order_count().await, 1);
        assert_eq!(h.store.markets.count(), 0);
    }

    #[tokio::test]
    async fn test_poll_error_is_recorded() {
        let h = harness(MarketFilter::all(), 100);
        h.chain.set_head(10);
        commit(&h, 10).await;
        h.chain.set_head(11);
        h.chain.fail_next("invalid params");

        assert!(h.watcher.catch_up().await);
        let status = h.store.status().await;
        assert!(status.last_error.is_some());
        assert_eq!(status.cutover_block, Some(10));
    }
}
