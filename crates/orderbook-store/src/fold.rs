//! Order-independent fold of historical logs into the open-order map.
//!
//! Creations, reductions and fills are fetched by independent queries and may
//! come back in any relative order. The fold applies every creation first and
//! then every delta with saturating subtraction, which commutes, so any
//! interleaving of the three lists produces the same map.

use orderbook_core::types::{BookEvent, DecodedLog, EventKey};
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::orders::{DeltaOutcome, OrderBook};

/// Counters describing one fold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldStats {
    pub created: u64,
    pub reduced: u64,
    pub filled: u64,
    /// Same event key seen more than once
    pub duplicates: u64,
    /// Second creation for an order id already in the map
    pub conflicting_creations: u64,
    /// Reduction or fill for an order the fold never saw created
    pub unknown_orders: u64,
    /// Deltas larger than the remaining amount
    pub underflows: u64,
    /// Orders removed because nothing was left
    pub closed: u64,
}

/// Accumulates a snapshot. Feed creations, then deltas, then [`SnapshotFold::finish`].
#[derive(Debug, Default)]
pub struct SnapshotFold {
    book: OrderBook,
    seen: HashSet<EventKey>,
    stats: FoldStats,
}

impl SnapshotFold {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold any mix of logs. Events other than creations, reductions and fills are ignored.
    pub fn fold<'a>(logs: impl IntoIterator<Item = &'a DecodedLog>) -> (OrderBook, FoldStats) {
        let logs: Vec<&DecodedLog> = logs.into_iter().collect();
        let mut fold = Self::new();
        fold.apply_creations(logs.iter().copied());
        fold.apply_deltas(logs.iter().copied());
        fold.finish()
    }

    fn first_sighting(&mut self, log: &DecodedLog) -> bool {
        if self.seen.insert(log.key()) {
            true
        } else {
            self.stats.duplicates += 1;
            debug!(
                tx_hash = ?log.meta.key.tx_hash,
                log_index = log.meta.key.log_index,
                "Duplicate log ignored by fold"
            );
            false
        }
    }

    /// Insert every `OrderCreated` among `logs`
    pub fn apply_creations<'a>(&mut self, logs: impl IntoIterator<Item = &'a DecodedLog>) {
        for log in logs {
            let BookEvent::OrderCreated(order) = &log.event else {
                continue;
            };
            if !self.first_sighting(log) {
                continue;
            }

            if self.book.insert(order.clone()) {
                self.stats.created += 1;
            } else {
                self.stats.conflicting_creations += 1;
                warn!(
                    market_id = ?order.market_id,
                    order_id = %order.order_id,
                    tx_hash = ?log.meta.key.tx_hash,
                    "Order id created twice, keeping the first creation"
                );
            }
        }
    }

    /// Apply every reduction and fill among `logs`
    pub fn apply_deltas<'a>(&mut self, logs: impl IntoIterator<Item = &'a DecodedLog>) {
        for log in logs {
            let Some((key, amount0)) = log.event.order_delta() else {
                continue;
            };
            if !self.first_sighting(log) {
                continue;
            }

            match log.event {
                BookEvent::OrderFilled(_) => self.stats.filled += 1,
                _ => self.stats.reduced += 1,
            }

            match self.book.apply_delta(&key, amount0) {
                DeltaOutcome::Applied { .. } | DeltaOutcome::Exhausted => {}
                DeltaOutcome::Clamped { shortfall } => {
                    self.stats.underflows += 1;
                    warn!(
                        market_id = ?key.market_id,
                        order_id = %key.order_id,
                        amount0 = %amount0,
                        shortfall = %shortfall,
                        block = log.meta.block_number,
                        "Delta exceeds remaining amount, clamped to zero"
                    );
                }
                DeltaOutcome::UnknownOrder => {
                    self.stats.unknown_orders += 1;
                    warn!(
                        event = log.event.kind().name(),
                        market_id = ?key.market_id,
                        order_id = %key.order_id,
                        block = log.meta.block_number,
                        "Delta for an order with no known creation, ignoring"
                    );
                }
            }
        }
    }

    /// Drop exhausted orders and hand back the open-order map
    pub fn finish(mut self) -> (OrderBook, FoldStats) {
        self.stats.closed = self.book.prune_exhausted() as u64;
        (self.book, self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::tests::order;
    use alloy_primitives::{Address, FixedBytes, B256, U256};
    use orderbook_core::types::{Fill, LogMeta, OrderDelta, OrderKey};

    fn meta(tx: u8, log_index: u64, block: u64) -> LogMeta {
        LogMeta {
            key: EventKey::new(B256::repeat_byte(tx), log_index),
            block_number: block,
            address: Address::ZERO,
        }
    }

    fn created(tx: u8, id: u64, amount: u64) -> DecodedLog {
        DecodedLog {
            meta: meta(tx, 0, tx as u64),
            event: BookEvent::OrderCreated(order(1, id, 1, amount)),
        }
    }

    fn reduced(tx: u8, id: u64, amount: u64) -> DecodedLog {
        DecodedLog {
            meta: meta(tx, 0, tx as u64),
            event: BookEvent::OrderReduced(OrderDelta {
                market_id: FixedBytes::repeat_byte(1),
                order_id: U256::from(id),
                maker: Address::with_last_byte(1),
                amount0: U256::from(amount),
            }),
        }
    }

    fn filled(tx: u8, id: u64, amount: u64) -> DecodedLog {
        DecodedLog {
            meta: meta(tx, 1, tx as u64),
            event: BookEvent::OrderFilled(Fill {
                key: EventKey::new(B256::repeat_byte(tx), 1),
                market_id: FixedBytes::repeat_byte(1),
                order_id: U256::from(id),
                token0: Address::ZERO,
                token1: Address::ZERO,
                amount0_filled: U256::from(amount),
                amount1_spent: U256::from(amount * 2),
                taker: Address::with_last_byte(9),
                maker: None,
                block_number: tx as u64,
            }),
        }
    }

    fn key(id: u64) -> OrderKey {
        OrderKey::new(FixedBytes::repeat_byte(1), U256::from(id))
    }

    fn fold_lists(lists: [&[DecodedLog]; 3]) -> OrderBook {
        SnapshotFold::fold(lists.into_iter().flatten()).0
    }

    #[test]
    fn test_fill_then_cancel_closes_order() {
        let logs = vec![created(1, 1, 100), filled(2, 1, 40), reduced(3, 1, 60)];
        let (book, stats) = SnapshotFold::fold(&logs);
        assert!(book.get(&key(1)).is_none());
        assert!(book.is_empty());
        assert_eq!(stats.closed, 1);
        assert_eq!(stats.underflows, 0);
    }

    #[test]
    fn test_fill_without_creation_is_noop() {
        let logs = vec![filled(2, 5, 10)];
        let (book, stats) = SnapshotFold::fold(&logs);
        assert!(book.is_empty());
        assert_eq!(stats.unknown_orders, 1);
    }

    #[test]
    fn test_result_independent_of_list_order() {
        let creations = vec![created(1, 1, 100), created(2, 2, 50), created(3, 3, 70)];
        let reductions = vec![reduced(4, 1, 30), reduced(5, 3, 70)];
        let fills = vec![filled(6, 1, 20), filled(7, 2, 10), filled(8, 9, 5)];

        let expected = fold_lists([&creations, &reductions, &fills]);
        let permutations: [[&[DecodedLog]; 3]; 5] = [
            [&creations, &fills, &reductions],
            [&reductions, &creations, &fills],
            [&reductions, &fills, &creations],
            [&fills, &creations, &reductions],
            [&fills, &reductions, &creations],
        ];
        for lists in permutations {
            assert_eq!(fold_lists(lists), expected);
        }

        assert_eq!(expected.len(), 2);
        assert_eq!(expected.get(&key(1)).unwrap().remaining_amount0, U256::from(50u64));
        assert_eq!(expected.get(&key(2)).unwrap().remaining_amount0, U256::from(40u64));
    }

    #[test]
    fn test_underflow_clamps_and_duplicates_apply_once() {
        let logs = vec![
            created(1, 1, 100),
            filled(2, 1, 30),
            filled(2, 1, 30),
            reduced(3, 1, 500),
            created(1, 1, 100),
        ];
        let (book, stats) = SnapshotFold::fold(&logs);
        assert!(book.is_empty());
        assert_eq!(stats.duplicates, 2);
        assert_eq!(stats.underflows, 1);
        assert_eq!(stats.filled, 1);
    }

    #[test]
    fn test_remaining_never_exceeds_initial() {
        let logs = vec![
            created(1, 1, 100),
            created(2, 2, 100),
            reduced(3, 1, 1),
            filled(4, 2, 99),
        ];
        let (book, _) = SnapshotFold::fold(&logs);
        for order in book.iter() {
            assert!(order.remaining_amount0 <= order.initial_amount0);
            assert!(order.is_open());
        }
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_conflicting_creation_keeps_first() {
        let mut second = created(9, 1, 999);
        second.meta.key.log_index = 4;
        let logs = vec![created(1, 1, 100), second];
        let (book, stats) = SnapshotFold::fold(&logs);
        assert_eq!(stats.conflicting_creations, 1);
        assert_eq!(book.get(&key(1)).unwrap().initial_amount0, U256::from(100u64));
    }
}
