//! Raw RPC logs to the domain event model.
//!
//! A log that cannot be placed on chain (no block, tx hash or log index) or
//! whose data does not match the ABI is skipped with a warning. It never
//! aborts a fold or a live batch.

use alloy::rpc::types::Log;
use alloy_sol_types::SolEvent;
use orderbook_core::events::{
    EventKind, MarketCreated, OrderCreated, OrderFilled, OrderReducedOrCancelled, PriceFeedSet,
};
use orderbook_core::types::{
    BookEvent, DecodedLog, EventKey, Fill, LogMeta, Market, Order, OrderDelta, PriceFeed,
};
use orderbook_core::{IndexerError, Result};
use tracing::{trace, warn};

/// Position of a log on chain, or the name of the first missing field
fn log_meta(log: &Log) -> Result<LogMeta> {
    let block_number = log
        .block_number
        .ok_or(IndexerError::MissingLogField("block_number"))?;
    let tx_hash = log
        .transaction_hash
        .ok_or(IndexerError::MissingLogField("transaction_hash"))?;
    let log_index = log
        .log_index
        .ok_or(IndexerError::MissingLogField("log_index"))?;

    Ok(LogMeta {
        key: EventKey::new(tx_hash, log_index),
        block_number,
        address: log.address(),
    })
}

fn decode_err(e: impl std::fmt::Display) -> IndexerError {
    IndexerError::EventDecode(e.to_string())
}

/// Decode one log. `Ok(None)` means the topic is not an exchange event.
pub fn decode_log(log: &Log) -> Result<Option<DecodedLog>> {
    let Some(kind) = log.topic0().and_then(EventKind::from_signature) else {
        return Ok(None);
    };
    let meta = log_meta(log)?;

    let event = match kind {
        EventKind::MarketCreated => {
            let event = MarketCreated::decode_log(&log.inner).map_err(decode_err)?.data;
            BookEvent::MarketCreated(Market {
                market_id: event.marketId,
                token0: event.token0,
                token1: event.token1,
                created_at_block: meta.block_number,
                created_at_tx: meta.key.tx_hash,
            })
        }
        EventKind::OrderCreated => {
            let event = OrderCreated::decode_log(&log.inner).map_err(decode_err)?.data;
            BookEvent::OrderCreated(Order {
                order_id: event.orderId,
                market_id: event.marketId,
                maker: event.maker,
                token0: event.token0,
                token1: event.token1,
                initial_amount0: event.amount0,
                remaining_amount0: event.amount0,
                max_price: event.maxPrice,
                min_price: event.minPrice,
                created_at_block: meta.block_number,
                created_at_tx: meta.key.tx_hash,
            })
        }
        EventKind::OrderReducedOrCancelled => {
            let event = OrderReducedOrCancelled::decode_log(&log.inner)
                .map_err(decode_err)?
                .data;
            BookEvent::OrderReduced(OrderDelta {
                market_id: event.marketId,
                order_id: event.orderId,
                maker: event.maker,
                amount0: event.amount0Closed,
            })
        }
        EventKind::OrderFilled => {
            let event = OrderFilled::decode_log(&log.inner).map_err(decode_err)?.data;
            BookEvent::OrderFilled(Fill {
                key: meta.key,
                market_id: event.marketId,
                order_id: event.orderId,
                token0: event.token0,
                token1: event.token1,
                amount0_filled: event.amount0Filled,
                amount1_spent: event.amount1Spent,
                taker: event.taker,
                maker: None,
                block_number: meta.block_number,
            })
        }
        EventKind::PriceFeedSet => {
            let event = PriceFeedSet::decode_log(&log.inner).map_err(decode_err)?.data;
            BookEvent::PriceFeedSet(PriceFeed {
                token: event.tokenAddress,
                price_feed_id: event.priceFeedId,
                owner: event.owner,
                set_at_block: meta.block_number,
            })
        }
    };

    Ok(Some(DecodedLog { meta, event }))
}

/// Decode a batch, dropping logs that are removed, foreign or malformed
pub fn decode_logs<'a>(logs: impl IntoIterator<Item = &'a Log>) -> Vec<DecodedLog> {
    let mut decoded = Vec::new();
    let mut skipped = 0u64;

    for log in logs {
        if log.removed {
            trace!(tx_hash = ?log.transaction_hash, "Skipping log removed by reorg");
            continue;
        }
        match decode_log(log) {
            Ok(Some(event)) => decoded.push(event),
            Ok(None) => {
                trace!(topic0 = ?log.topic0(), address = ?log.address(), "Skipping unrelated log");
            }
            Err(e) => {
                skipped += 1;
                warn!(
                    error = %e,
                    block = ?log.block_number,
                    tx_hash = ?log.transaction_hash,
                    log_index = ?log.log_index,
                    "Skipping malformed log"
                );
            }
        }
    }

    if skipped > 0 {
        orderbook_metrics::counters::logs_skipped(skipped);
    }
    decoded
}

/// Sort into chain order, block first then log index
pub fn sort_chain_order(events: &mut [DecodedLog]) {
    events.sort_by_key(|e| e.meta.position());
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy_primitives::{Address, FixedBytes, B256, U256};

    pub(crate) fn rpc_log(
        event: &impl SolEvent,
        block: Option<u64>,
        tx: u8,
        log_index: u64,
    ) -> Log {
        Log {
            inner: alloy_primitives::Log {
                address: Address::with_last_byte(0xEE),
                data: event.encode_log_data(),
            },
            block_hash: None,
            block_number: block,
            block_timestamp: None,
            transaction_hash: Some(B256::repeat_byte(tx)),
            transaction_index: None,
            log_index: Some(log_index),
            removed: false,
        }
    }

    pub(crate) fn created_event(market: u8, id: u64, maker: u8, amount: u64) -> OrderCreated {
        OrderCreated {
            marketId: FixedBytes::repeat_byte(market),
            maker: Address::with_last_byte(maker),
            token0: Address::with_last_byte(0xA0),
            token1: Address::with_last_byte(0xB0),
            amount0: U256::from(amount),
            maxPrice: U256::ZERO,
            minPrice: U256::ZERO,
            orderId: U256::from(id),
        }
    }

    pub(crate) fn filled_event(market: u8, id: u64, amount: u64, taker: u8) -> OrderFilled {
        OrderFilled {
            marketId: FixedBytes::repeat_byte(market),
            token0: Address::with_last_byte(0xA0),
            token1: Address::with_last_byte(0xB0),
            orderId: U256::from(id),
            amount0Filled: U256::from(amount),
            amount1Spent: U256::from(amount * 3),
            taker: Address::with_last_byte(taker),
        }
    }

    #[test]
    fn test_decode_order_created() {
        let log = rpc_log(&created_event(1, 7, 2, 100), Some(10), 1, 3);
        let decoded = decode_log(&log).unwrap().unwrap();

        assert_eq!(decoded.block_number(), 10);
        assert_eq!(decoded.key(), EventKey::new(B256::repeat_byte(1), 3));
        let BookEvent::OrderCreated(order) = decoded.event else {
            panic!("expected OrderCreated");
        };
        assert_eq!(order.order_id, U256::from(7u64));
        assert_eq!(order.maker, Address::with_last_byte(2));
        assert_eq!(order.remaining_amount0, order.initial_amount0);
    }

    #[test]
    fn test_decode_fill_topics() {
        let log = rpc_log(&filled_event(1, 7, 40, 9), Some(11), 2, 0);
        let decoded = decode_log(&log).unwrap().unwrap();
        let BookEvent::OrderFilled(fill) = decoded.event else {
            panic!("expected OrderFilled");
        };
        assert_eq!(fill.taker, Address::with_last_byte(9));
        assert_eq!(fill.amount0_filled, U256::from(40u64));
        assert_eq!(fill.amount1_spent, U256::from(120u64));
        assert!(fill.maker.is_none());
    }

    #[test]
    fn test_missing_position_is_skipped() {
        let good = rpc_log(&created_event(1, 1, 2, 100), Some(10), 1, 0);
        let pending = rpc_log(&created_event(1, 2, 2, 100), None, 2, 0);
        assert!(matches!(
            decode_log(&pending),
            Err(IndexerError::MissingLogField("block_number"))
        ));

        let mut truncated = rpc_log(&created_event(1, 3, 2, 100), Some(10), 3, 1);
        truncated.inner.data = alloy_primitives::LogData::new_unchecked(
            truncated.inner.data.topics().to_vec(),
            vec![1u8, 2, 3].into(),
        );

        let mut removed = rpc_log(&created_event(1, 4, 2, 100), Some(10), 4, 2);
        removed.removed = true;

        let decoded = decode_logs([&good, &pending, &truncated, &removed]);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].block_number(), 10);
    }

    #[test]
    fn test_unrelated_topic_ignored() {
        let mut log = rpc_log(&created_event(1, 1, 2, 100), Some(10), 1, 0);
        log.inner.data = alloy_primitives::LogData::new_unchecked(vec![B256::ZERO], Default::default());
        assert!(decode_log(&log).unwrap().is_none());
    }

    #[test]
    fn test_sort_chain_order() {
        let mut events = decode_logs(&[
            rpc_log(&created_event(1, 1, 2, 100), Some(12), 1, 0),
            rpc_log(&created_event(1, 2, 2, 100), Some(10), 2, 5),
            rpc_log(&created_event(1, 3, 2, 100), Some(10), 3, 1),
        ]);
        sort_chain_order(&mut events);
        let positions: Vec<(u64, u64)> = events.iter().map(|e| e.meta.position()).collect();
        assert_eq!(positions, vec![(10, 1), (10, 5), (12, 0)]);
    }
}
