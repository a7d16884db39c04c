mod exchange;

pub use exchange::*;

use alloy_primitives::B256;
use alloy_sol_types::SolEvent;

/// Every event kind the exchange emits that the indexer consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    MarketCreated,
    OrderCreated,
    OrderReducedOrCancelled,
    OrderFilled,
    PriceFeedSet,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::MarketCreated,
        EventKind::OrderCreated,
        EventKind::OrderReducedOrCancelled,
        EventKind::OrderFilled,
        EventKind::PriceFeedSet,
    ];

    /// Topic0 of the event
    pub fn signature(&self) -> B256 {
        match self {
            Self::MarketCreated => MarketCreated::SIGNATURE_HASH,
            Self::OrderCreated => OrderCreated::SIGNATURE_HASH,
            Self::OrderReducedOrCancelled => OrderReducedOrCancelled::SIGNATURE_HASH,
            Self::OrderFilled => OrderFilled::SIGNATURE_HASH,
            Self::PriceFeedSet => PriceFeedSet::SIGNATURE_HASH,
        }
    }

    pub fn from_signature(topic0: &B256) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.signature() == *topic0)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MarketCreated => "MarketCreated",
            Self::OrderCreated => "OrderCreated",
            Self::OrderReducedOrCancelled => "OrderReducedOrCancelled",
            Self::OrderFilled => "OrderFilled",
            Self::PriceFeedSet => "PriceFeedSet",
        }
    }

    /// Whether logs of this kind carry `marketId` as topic1
    pub fn is_market_scoped(&self) -> bool {
        !matches!(self, Self::PriceFeedSet)
    }

    /// Whether logs of this kind carry the maker as topic2
    pub fn has_maker_topic(&self) -> bool {
        matches!(self, Self::OrderCreated | Self::OrderReducedOrCancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_roundtrip() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_signature(&kind.signature()), Some(kind));
        }
        assert_eq!(EventKind::from_signature(&B256::ZERO), None);
    }

    #[test]
    fn test_signatures_distinct() {
        let mut sigs: Vec<B256> = EventKind::ALL.iter().map(|k| k.signature()).collect();
        sigs.sort();
        sigs.dedup();
        assert_eq!(sigs.len(), EventKind::ALL.len());
    }
}
