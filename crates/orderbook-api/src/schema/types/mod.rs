mod call;
mod market;
mod order;
mod status;
mod trade;

pub use call::{GqlAllowance, GqlCallRequest, GqlPriceUpdate};
pub use market::{GqlMarket, GqlMarketStats, GqlPriceFeed};
pub use order::GqlOrder;
pub use status::{GqlSyncStats, GqlSyncStatus};
pub use trade::{GqlTrade, GqlTradeRole};

use alloy_primitives::U256;
use orderbook_core::format::format_amount;

/// Human-readable amount, when the token's decimals are known
pub(crate) fn formatted(raw: U256, decimals: Option<u8>) -> Option<String> {
    decimals.map(|d| format_amount(raw, d))
}
