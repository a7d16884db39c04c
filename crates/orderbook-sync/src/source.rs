use alloy::rpc::types::{Filter, Log};
use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use orderbook_core::calls::CallRequest;
use orderbook_core::events::EventKind;
use orderbook_core::types::MarketFilter;
use orderbook_core::Result;

/// Chain reads the sync layer depends on
#[async_trait]
pub trait LogSource: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    async fn head_block(&self) -> Result<u64>;

    /// `eth_getLogs` for one query; the range is inclusive
    async fn logs(&self, query: &LogQuery) -> Result<Vec<Log>>;
}

/// Read-only contract calls (`eth_call`)
#[async_trait]
pub trait CallSource: Send + Sync {
    async fn call(&self, request: &CallRequest) -> Result<Bytes>;
}

/// One log query: event kinds, block range and indexed-topic narrowing.
///
/// Topic positions differ per event: `marketId` is topic1 for every
/// market-scoped event, `maker` is topic2 for creations and reductions, and
/// fills carry `orderId` in topic2 and `taker` in topic3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub kinds: Vec<EventKind>,
    pub from_block: u64,
    pub to_block: u64,
    pub market_ids: Vec<B256>,
    pub maker: Option<Address>,
    pub order_ids: Vec<U256>,
    pub taker: Option<Address>,
}

impl LogQuery {
    pub fn new(address: Address, kinds: impl Into<Vec<EventKind>>, from_block: u64, to_block: u64) -> Self {
        Self {
            address,
            kinds: kinds.into(),
            from_block,
            to_block,
            market_ids: Vec::new(),
            maker: None,
            order_ids: Vec::new(),
            taker: None,
        }
    }

    /// Apply a market filter. The maker only narrows creations and reductions.
    pub fn with_filter(mut self, filter: &MarketFilter) -> Self {
        if self.kinds.iter().all(EventKind::is_market_scoped) {
            self.market_ids = filter.market_ids.clone();
        }
        if self.kinds.iter().all(|k| k.has_maker_topic()) {
            self.maker = filter.maker;
        }
        self
    }

    pub fn with_taker(mut self, taker: Address) -> Self {
        self.taker = Some(taker);
        self
    }

    pub fn with_order_ids(mut self, order_ids: Vec<U256>) -> Self {
        self.order_ids = order_ids;
        self
    }

    /// Same query over another block range
    pub fn with_range(&self, from_block: u64, to_block: u64) -> Self {
        Self {
            from_block,
            to_block,
            ..self.clone()
        }
    }

    pub fn block_span(&self) -> u64 {
        self.to_block.saturating_sub(self.from_block) + 1
    }

    fn fills_only(&self) -> bool {
        self.kinds.iter().all(|k| *k == EventKind::OrderFilled)
    }

    pub fn to_filter(&self) -> Filter {
        let signatures: Vec<B256> = self.kinds.iter().map(EventKind::signature).collect();
        let mut filter = Filter::new()
            .address(self.address)
            .event_signature(signatures)
            .from_block(self.from_block)
            .to_block(self.to_block);

        if !self.market_ids.is_empty() {
            filter = filter.topic1(self.market_ids.clone());
        }
        if let Some(maker) = self.maker {
            filter = filter.topic2(maker.into_word());
        }
        if self.fills_only() {
            if !self.order_ids.is_empty() {
                let ids: Vec<B256> = self.order_ids.iter().map(|id| B256::from(*id)).collect();
                filter = filter.topic2(ids);
            }
            if let Some(taker) = self.taker {
                filter = filter.topic3(taker.into_word());
            }
        }
        filter
    }
}
