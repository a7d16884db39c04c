use alloy_primitives::Address;
use orderbook_core::types::{Fill, TradeRole};
use orderbook_core::Result;
use tracing::debug;

use crate::snapshot::SnapshotBuilder;

/// Backfills a user's fills from the chain when the retained history is
/// shorter than requested
#[derive(Clone)]
pub struct TradeLookup {
    builder: SnapshotBuilder,
    start_block: u64,
}

impl TradeLookup {
    pub fn new(builder: SnapshotBuilder, start_block: u64) -> Self {
        Self {
            builder,
            start_block,
        }
    }

    /// Merge `retained` with the user's fills over `[start_block, head]`,
    /// most recent first, deduplicated by event key and cut to `limit`.
    /// A full `retained` list is returned without touching the chain.
    pub async fn user_trades(
        &self,
        retained: Vec<Fill>,
        user: Address,
        role: TradeRole,
        limit: usize,
    ) -> Result<Vec<Fill>> {
        if retained.len() >= limit {
            return Ok(retained);
        }

        let head = self.builder.fetcher().source().head_block().await?;
        if head < self.start_block {
            return Ok(retained);
        }

        let fetched = self
            .builder
            .user_fills(self.start_block, head, user, role)
            .await?;
        debug!(
            user = ?user,
            retained = retained.len(),
            fetched = fetched.len(),
            "User fills backfilled from chain"
        );

        let mut fills = retained;
        fills.extend(fetched);
        fills.sort_by(|a, b| b.recency().cmp(&a.recency()).then(b.key.cmp(&a.key)));
        fills.dedup_by_key(|fill| fill.key);
        fills.truncate(limit);
        Ok(fills)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::builder;
    use crate::source::tests::{created_log, filled_log, MockChain};
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn chain() -> Arc<MockChain> {
        let chain = Arc::new(MockChain::new(1, 100));
        chain.push(created_log(1, 1, 7, 100, 10, 1, 0));
        chain.push(filled_log(1, 1, 10, 9, 11, 2, 0));
        chain.push(filled_log(1, 1, 20, 9, 12, 3, 0));
        chain.push(filled_log(1, 1, 30, 9, 13, 4, 0));
        chain
    }

    #[tokio::test]
    async fn test_short_history_is_backfilled() {
        let chain = chain();
        let lookup = TradeLookup::new(builder(chain.clone()), 0);

        // the newest fill is already retained
        let all = builder(chain)
            .user_fills(0, 100, Address::with_last_byte(9), TradeRole::Taker)
            .await
            .unwrap();
        let retained = vec![all[0].clone()];

        let fills = lookup
            .user_trades(retained, Address::with_last_byte(9), TradeRole::Taker, 50)
            .await
            .unwrap();
        let blocks: Vec<u64> = fills.iter().map(|f| f.block_number).collect();
        assert_eq!(blocks, vec![13, 12, 11]);
        assert!(fills.iter().all(|f| f.maker == Some(Address::with_last_byte(7))));

        let two = lookup
            .user_trades(Vec::new(), Address::with_last_byte(7), TradeRole::Maker, 2)
            .await
            .unwrap();
        assert_eq!(two.len(), 2);
        assert_eq!(two[0].block_number, 13);
    }

    #[tokio::test]
    async fn test_full_history_skips_chain() {
        let chain = chain();
        let all = builder(chain.clone())
            .user_fills(0, 100, Address::with_last_byte(9), TradeRole::Taker)
            .await
            .unwrap();
        let calls = chain.log_calls.load(Ordering::SeqCst);

        let lookup = TradeLookup::new(builder(chain.clone()), 0);
        let fills = lookup
            .user_trades(all.clone(), Address::with_last_byte(9), TradeRole::Taker, 3)
            .await
            .unwrap();
        assert_eq!(fills, all);
        assert_eq!(chain.log_calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn test_head_below_start_returns_retained() {
        let lookup = TradeLookup::new(builder(chain()), 500);
        let fills = lookup
            .user_trades(Vec::new(), Address::with_last_byte(9), TradeRole::Either, 10)
            .await
            .unwrap();
        assert!(fills.is_empty());
    }
}
