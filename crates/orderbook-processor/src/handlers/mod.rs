mod market_created;
mod order_created;
mod order_filled;
mod order_reduced;
mod price_feed_set;

pub use market_created::MarketCreatedHandler;
pub use order_created::OrderCreatedHandler;
pub use order_filled::OrderFilledHandler;
pub use order_reduced::OrderReducedHandler;
pub use price_feed_set::PriceFeedSetHandler;

use alloy_primitives::U256;
use orderbook_core::types::{LogMeta, OrderKey};
use orderbook_store::DeltaOutcome;
use tracing::{debug, warn};

/// Log and count the result of removing token0 from a live order
fn report_delta(event: &'static str, key: &OrderKey, amount0: U256, outcome: DeltaOutcome, meta: &LogMeta) {
    match outcome {
        DeltaOutcome::Applied { remaining } => {
            debug!(
                event = event,
                market_id = ?key.market_id,
                order_id = %key.order_id,
                amount0 = %amount0,
                remaining = %remaining,
                "Order reduced"
            );
        }
        DeltaOutcome::Exhausted => {
            debug!(
                event = event,
                market_id = ?key.market_id,
                order_id = %key.order_id,
                "Order exhausted, removed from open set"
            );
        }
        DeltaOutcome::Clamped { shortfall } => {
            orderbook_metrics::counters::underflows(1);
            warn!(
                event = event,
                market_id = ?key.market_id,
                order_id = %key.order_id,
                amount0 = %amount0,
                shortfall = %shortfall,
                block = meta.block_number,
                tx_hash = ?meta.key.tx_hash,
                "Delta exceeds remaining amount, clamped to zero"
            );
        }
        DeltaOutcome::UnknownOrder => {
            orderbook_metrics::counters::unknown_order_deltas(1);
            warn!(
                event = event,
                market_id = ?key.market_id,
                order_id = %key.order_id,
                block = meta.block_number,
                tx_hash = ?meta.key.tx_hash,
                "Delta for an order not in the book, ignoring"
            );
        }
    }
}
