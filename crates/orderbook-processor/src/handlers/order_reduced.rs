use orderbook_core::types::{LogMeta, OrderDelta, OrderKey};
use orderbook_store::{BookState, DeltaOutcome};

use super::report_delta;

pub struct OrderReducedHandler;

impl OrderReducedHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, state: &mut BookState, delta: &OrderDelta, meta: &LogMeta) -> DeltaOutcome {
        let key = OrderKey::new(delta.market_id, delta.order_id);
        let outcome = state.apply_delta(&key, delta.amount0);
        report_delta("OrderReducedOrCancelled", &key, delta.amount0, outcome, meta);
        outcome
    }
}

impl Default for OrderReducedHandler {
    fn default() -> Self {
        Self::new()
    }
}
