use orderbook_core::types::{now_millis, BookEvent, DecodedLog, Fill, Market, PriceFeed};
use orderbook_store::{Admission, BookStore, FoldStats, OrderBook};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::decode::sort_chain_order;
use crate::handlers::{
    MarketCreatedHandler, OrderCreatedHandler, OrderFilledHandler, OrderReducedHandler,
    PriceFeedSetHandler,
};

/// Logs polled by the live watcher for `[from_block, to_block]`, tagged with
/// the generation that was current when the poll started
#[derive(Debug, Clone)]
pub struct LiveBatch {
    pub generation: u64,
    pub from_block: u64,
    pub to_block: u64,
    pub events: Vec<DecodedLog>,
}

/// A folded historical snapshot, ready to replace the book
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub from_block: u64,
    /// Becomes the cutover block on commit
    pub to_block: u64,
    pub book: OrderBook,
    pub stats: FoldStats,
    pub markets: Vec<Market>,
    pub price_feeds: Vec<PriceFeed>,
    /// Fills in the range, maker attributed where the creation was seen
    pub fills: Vec<Fill>,
}

/// What happened to a live batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Applied { applied: usize, discarded: usize },
    /// A resync committed after the batch was fetched
    Superseded { batch_generation: u64, current: u64 },
    ShuttingDown,
}

/// What happened to a snapshot commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed { generation: u64 },
    ShuttingDown,
}

/// Routes decoded events onto the single state cell
pub struct EventProcessor {
    store: Arc<BookStore>,
    shutdown: Arc<AtomicBool>,

    // Handlers
    market_created: MarketCreatedHandler,
    order_created: OrderCreatedHandler,
    order_reduced: OrderReducedHandler,
    order_filled: OrderFilledHandler,
    price_feed_set: PriceFeedSetHandler,
}

impl EventProcessor {
    pub fn new(store: Arc<BookStore>, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            market_created: MarketCreatedHandler::new(store.clone()),
            order_created: OrderCreatedHandler::new(),
            order_reduced: OrderReducedHandler::new(),
            order_filled: OrderFilledHandler::new(store.clone()),
            price_feed_set: PriceFeedSetHandler::new(store.clone()),
            store,
            shutdown,
        }
    }

    /// Get reference to the store
    pub fn store(&self) -> &Arc<BookStore> {
        &self.store
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Apply a polled batch under one write lock.
    ///
    /// The whole batch is dropped if shutdown has begun or a resync committed
    /// since the poll started. Otherwise each event passes the cutover guard
    /// and the seen set before it reaches a handler.
    pub async fn apply_live_batch(&self, mut batch: LiveBatch) -> BatchOutcome {
        let start = Instant::now();

        if self.is_shutting_down() {
            orderbook_metrics::counters::live_batches_discarded(1);
            debug!(from = batch.from_block, to = batch.to_block, "Shutting down, live batch dropped");
            return BatchOutcome::ShuttingDown;
        }

        sort_chain_order(&mut batch.events);

        let mut state = self.store.state.write().await;
        let current = state.generation();
        if current != batch.generation {
            drop(state);
            orderbook_metrics::counters::live_batches_discarded(1);
            self.store.status.write().await.live_batch_discarded();
            debug!(
                batch_generation = batch.generation,
                current_generation = current,
                from = batch.from_block,
                to = batch.to_block,
                "Live batch superseded by resync, dropped"
            );
            return BatchOutcome::Superseded {
                batch_generation: batch.generation,
                current,
            };
        }

        let mut applied = 0usize;
        let mut discarded = 0usize;

        for log in &batch.events {
            match state.admit(&log.meta) {
                Admission::Fresh => {}
                Admission::Stale => {
                    discarded += 1;
                    orderbook_metrics::counters::events_discarded(1, "stale");
                    trace!(block = log.block_number(), "Live event at or below cutover, discarded");
                    continue;
                }
                Admission::Duplicate => {
                    discarded += 1;
                    orderbook_metrics::counters::events_discarded(1, "duplicate");
                    trace!(tx_hash = ?log.meta.key.tx_hash, log_index = log.meta.key.log_index, "Live event already applied");
                    continue;
                }
                Admission::NoCutover => {
                    discarded += 1;
                    orderbook_metrics::counters::events_discarded(1, "no_cutover");
                    continue;
                }
            }

            match &log.event {
                BookEvent::MarketCreated(market) => {
                    self.market_created.handle(market);
                }
                BookEvent::OrderCreated(order) => {
                    self.order_created.handle(&mut state, order, &log.meta);
                }
                BookEvent::OrderReduced(delta) => {
                    self.order_reduced.handle(&mut state, delta, &log.meta);
                }
                BookEvent::OrderFilled(fill) => {
                    self.order_filled.handle(&mut state, fill, &log.meta);
                }
                BookEvent::PriceFeedSet(feed) => self.price_feed_set.handle(feed),
            }
            applied += 1;
            orderbook_metrics::counters::events_applied(1, log.event.kind().name());
        }

        if state.cutover_block().is_some() {
            state.advance_cursor(batch.to_block);
        }
        let open_orders = state.book().len();
        drop(state);

        self.store
            .status
            .write()
            .await
            .live_batch(applied, discarded, batch.to_block);

        orderbook_metrics::gauges::set_live_block(batch.to_block);
        orderbook_metrics::gauges::set_open_orders(open_orders);
        orderbook_metrics::histograms::live_batch_duration(start.elapsed());

        if applied > 0 {
            info!(
                from = batch.from_block,
                to = batch.to_block,
                applied = applied,
                discarded = discarded,
                open_orders = open_orders,
                "Live batch applied"
            );
        } else {
            debug!(
                from = batch.from_block,
                to = batch.to_block,
                discarded = discarded,
                "Live batch had nothing to apply"
            );
        }

        BatchOutcome::Applied { applied, discarded }
    }

    /// Replace the book and trade histories with a snapshot and merge its
    /// markets and feeds.
    ///
    /// Sets the cutover to `snapshot.to_block`, clears the seen set, resets
    /// the live cursor and bumps the generation so in-flight live batches
    /// are dropped. Fills are swapped under the state lock, so live fills
    /// never interleave with the rebuild.
    pub async fn commit_snapshot(&self, snapshot: Snapshot) -> CommitOutcome {
        if self.is_shutting_down() {
            orderbook_metrics::counters::resyncs("discarded");
            warn!(to_block = snapshot.to_block, "Shutting down, snapshot not committed");
            return CommitOutcome::ShuttingDown;
        }

        let new_markets = self.store.markets.bulk_insert(snapshot.markets);
        for feed in snapshot.price_feeds {
            self.store.markets.set_price_feed(feed);
        }

        let open_orders = snapshot.book.len();
        let mut state = self.store.state.write().await;
        let fills_retained = self.store.trades.replace_all(snapshot.fills);
        let generation = state.commit_snapshot(snapshot.book, snapshot.to_block);
        drop(state);

        {
            let mut status = self.store.status.write().await;
            status.snapshot_committed(snapshot.to_block, now_millis());
            status.stats.markets_discovered += new_markets as u64;
            status.stats.fills_recorded += fills_retained as u64;
        }

        orderbook_metrics::counters::resyncs("ok");
        orderbook_metrics::counters::markets_discovered(new_markets as u64);
        orderbook_metrics::counters::fills_recorded(fills_retained as u64);
        orderbook_metrics::counters::underflows(snapshot.stats.underflows);
        orderbook_metrics::counters::unknown_order_deltas(snapshot.stats.unknown_orders);
        orderbook_metrics::gauges::set_cutover_block(snapshot.to_block);
        orderbook_metrics::gauges::set_generation(generation);
        orderbook_metrics::gauges::set_open_orders(open_orders);
        orderbook_metrics::gauges::set_markets(self.store.markets.count());

        info!(
            from_block = snapshot.from_block,
            cutover_block = snapshot.to_block,
            generation = generation,
            open_orders = open_orders,
            new_markets = new_markets,
            fills_retained = fills_retained,
            created = snapshot.stats.created,
            closed = snapshot.stats.closed,
            duplicates = snapshot.stats.duplicates,
            underflows = snapshot.stats.underflows,
            unknown_orders = snapshot.stats.unknown_orders,
            "Snapshot committed"
        );

        CommitOutcome::Committed { generation }
    }

    /// Record a failed snapshot without touching the committed book
    pub async fn record_snapshot_failure(&self, error: &str) {
        orderbook_metrics::counters::resyncs("failed");
        orderbook_metrics::counters::errors(1, "snapshot");
        self.store.status.write().await.snapshot_failed(error);
    }
}
