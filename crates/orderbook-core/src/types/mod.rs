mod event;
mod fill;
mod filter;
mod market;
mod order;

pub use event::{BookEvent, DecodedLog, EventKey, LogMeta, OrderDelta};
pub use fill::Fill;
pub use filter::{MarketFilter, TradeRole};
pub use market::{Market, MarketStats, PriceFeed};
pub use order::{Order, OrderId, OrderKey};

use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
