use alloy_primitives::{Address, FixedBytes};

/// Narrows log queries through indexed topics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketFilter {
    /// Restrict to these markets; empty means all markets
    pub market_ids: Vec<FixedBytes<32>>,
    /// Restrict creations and reductions to one maker
    pub maker: Option<Address>,
}

impl MarketFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn markets(market_ids: Vec<FixedBytes<32>>) -> Self {
        Self {
            market_ids,
            maker: None,
        }
    }

    pub fn with_maker(mut self, maker: Address) -> Self {
        self.maker = Some(maker);
        self
    }
}

/// Which side of a fill a user participated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeRole {
    Maker,
    Taker,
    Either,
}
