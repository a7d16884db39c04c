use orderbook_core::types::{Fill, LogMeta};
use orderbook_store::{BookState, BookStore, DeltaOutcome};
use std::sync::Arc;

use super::report_delta;

pub struct OrderFilledHandler {
    store: Arc<BookStore>,
}

impl OrderFilledHandler {
    pub fn new(store: Arc<BookStore>) -> Self {
        Self { store }
    }

    /// Apply the fill to the book and record it in the trade histories.
    /// The maker is read from the book before the delta can remove the order.
    pub fn handle(&self, state: &mut BookState, fill: &Fill, meta: &LogMeta) -> DeltaOutcome {
        let key = fill.order_key();
        let mut fill = fill.clone();
        if fill.maker.is_none() {
            fill.maker = state.book().get(&key).map(|order| order.maker);
        }

        let outcome = state.apply_delta(&key, fill.amount0_filled);
        report_delta("OrderFilled", &key, fill.amount0_filled, outcome, meta);

        if self.store.trades.record(fill) {
            orderbook_metrics::counters::fills_recorded(1);
        }
        outcome
    }
}
