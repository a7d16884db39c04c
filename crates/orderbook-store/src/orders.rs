use alloy_primitives::{Address, FixedBytes, U256};
use orderbook_core::types::{Order, OrderKey};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Result of removing token0 from an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaOutcome {
    /// Order still has `remaining` left
    Applied { remaining: U256 },
    /// Order reached exactly zero
    Exhausted,
    /// Delta exceeded the remaining amount; clamped to zero
    Clamped { shortfall: U256 },
    /// No order with this key is in the map
    UnknownOrder,
}

impl DeltaOutcome {
    /// Whether the order is now at zero and must leave the open set
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Clamped { .. })
    }
}

/// Open orders keyed by (market, order id), with market and maker indexes.
///
/// Lives inside the single state cell, so it is a plain structure rather
/// than a concurrent map.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    orders: HashMap<OrderKey, Order>,
    /// Index: market_id -> order ids (ordered)
    market_orders: HashMap<FixedBytes<32>, BTreeSet<U256>>,
    /// Index: maker -> order keys
    maker_orders: HashMap<Address, HashSet<OrderKey>>,
}

impl PartialEq for OrderBook {
    fn eq(&self, other: &Self) -> bool {
        self.orders == other.orders
    }
}

impl Eq for OrderBook {}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new order. Returns false and leaves the book untouched if the key is taken.
    pub fn insert(&mut self, order: Order) -> bool {
        let key = order.key();
        if self.orders.contains_key(&key) {
            return false;
        }

        self.market_orders
            .entry(order.market_id)
            .or_default()
            .insert(order.order_id);
        self.maker_orders.entry(order.maker).or_default().insert(key);
        self.orders.insert(key, order);
        true
    }

    /// Subtract `amount0` from an order's remaining amount, saturating at zero.
    /// The order stays in the map; callers remove it or call [`Self::prune_exhausted`].
    pub fn apply_delta(&mut self, key: &OrderKey, amount0: U256) -> DeltaOutcome {
        let Some(order) = self.orders.get_mut(key) else {
            return DeltaOutcome::UnknownOrder;
        };

        let remaining = order.remaining_amount0;
        order.remaining_amount0 = remaining.saturating_sub(amount0);

        if amount0 > remaining {
            DeltaOutcome::Clamped {
                shortfall: amount0 - remaining,
            }
        } else if order.remaining_amount0.is_zero() {
            DeltaOutcome::Exhausted
        } else {
            DeltaOutcome::Applied {
                remaining: order.remaining_amount0,
            }
        }
    }

    /// Remove an order and its index entries
    pub fn remove(&mut self, key: &OrderKey) -> Option<Order> {
        let order = self.orders.remove(key)?;

        if let Some(ids) = self.market_orders.get_mut(&order.market_id) {
            ids.remove(&order.order_id);
            if ids.is_empty() {
                self.market_orders.remove(&order.market_id);
            }
        }
        if let Some(keys) = self.maker_orders.get_mut(&order.maker) {
            keys.remove(key);
            if keys.is_empty() {
                self.maker_orders.remove(&order.maker);
            }
        }

        Some(order)
    }

    /// Drop every order whose remaining amount is zero.
    /// Collects the keys first, then deletes, so no entry is removed mid-iteration.
    pub fn prune_exhausted(&mut self) -> usize {
        let exhausted: Vec<OrderKey> = self
            .orders
            .iter()
            .filter(|(_, order)| !order.is_open())
            .map(|(key, _)| *key)
            .collect();

        for key in &exhausted {
            self.remove(key);
        }
        exhausted.len()
    }

    pub fn get(&self, key: &OrderKey) -> Option<&Order> {
        self.orders.get(key)
    }

    pub fn contains(&self, key: &OrderKey) -> bool {
        self.orders.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    /// Open orders of a market, ascending by order id
    pub fn market_orders(&self, market_id: &FixedBytes<32>) -> Vec<Order> {
        self.market_orders
            .get(market_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.orders.get(&OrderKey::new(*market_id, *id)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Open orders of a maker across markets, ascending by key
    pub fn maker_orders(&self, maker: &Address) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .maker_orders
            .get(maker)
            .map(|keys| keys.iter().filter_map(|k| self.orders.get(k)).cloned().collect())
            .unwrap_or_default();
        orders.sort_by_key(|o| o.key());
        orders
    }

    /// Sum of remaining token0 and number of open orders in a market
    pub fn market_liquidity(&self, market_id: &FixedBytes<32>) -> (U256, usize) {
        self.market_orders
            .get(market_id)
            .map(|ids| {
                let total = ids
                    .iter()
                    .filter_map(|id| self.orders.get(&OrderKey::new(*market_id, *id)))
                    .fold(U256::ZERO, |acc, o| acc.saturating_add(o.remaining_amount0));
                (total, ids.len())
            })
            .unwrap_or((U256::ZERO, 0))
    }

    /// Markets with at least one open order
    pub fn active_markets(&self) -> Vec<FixedBytes<32>> {
        self.market_orders.keys().copied().collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy_primitives::B256;

    pub(crate) fn order(market: u8, id: u64, maker: u8, amount: u64) -> Order {
        Order {
            order_id: U256::from(id),
            market_id: FixedBytes::repeat_byte(market),
            maker: Address::with_last_byte(maker),
            token0: Address::with_last_byte(0xA0),
            token1: Address::with_last_byte(0xB0),
            initial_amount0: U256::from(amount),
            remaining_amount0: U256::from(amount),
            max_price: U256::ZERO,
            min_price: U256::ZERO,
            created_at_block: 1,
            created_at_tx: B256::ZERO,
        }
    }

    #[test]
    fn test_insert_is_idempotent_per_key() {
        let mut book = OrderBook::new();
        assert!(book.insert(order(1, 1, 1, 100)));
        assert!(!book.insert(order(1, 1, 2, 999)));
        assert_eq!(book.len(), 1);
        assert_eq!(
            book.get(&OrderKey::new(FixedBytes::repeat_byte(1), U256::from(1u64)))
                .unwrap()
                .initial_amount0,
            U256::from(100u64)
        );
    }

    #[test]
    fn test_apply_delta_outcomes() {
        let mut book = OrderBook::new();
        book.insert(order(1, 1, 1, 100));
        let key = OrderKey::new(FixedBytes::repeat_byte(1), U256::from(1u64));

        assert_eq!(
            book.apply_delta(&key, U256::from(40u64)),
            DeltaOutcome::Applied {
                remaining: U256::from(60u64)
            }
        );
        assert_eq!(book.apply_delta(&key, U256::from(60u64)), DeltaOutcome::Exhausted);
        assert_eq!(
            book.apply_delta(&key, U256::from(5u64)),
            DeltaOutcome::Clamped {
                shortfall: U256::from(5u64)
            }
        );
        assert_eq!(book.get(&key).unwrap().remaining_amount0, U256::ZERO);

        let missing = OrderKey::new(FixedBytes::repeat_byte(1), U256::from(9u64));
        assert_eq!(book.apply_delta(&missing, U256::from(1u64)), DeltaOutcome::UnknownOrder);
    }

    #[test]
    fn test_prune_and_indexes() {
        let mut book = OrderBook::new();
        book.insert(order(1, 1, 7, 100));
        book.insert(order(1, 2, 7, 50));
        book.insert(order(2, 1, 8, 10));

        let key = OrderKey::new(FixedBytes::repeat_byte(1), U256::from(2u64));
        book.apply_delta(&key, U256::from(50u64));

        assert_eq!(book.prune_exhausted(), 1);
        assert_eq!(book.len(), 2);
        assert_eq!(book.market_orders(&FixedBytes::repeat_byte(1)).len(), 1);
        assert_eq!(book.maker_orders(&Address::with_last_byte(7)).len(), 1);
        assert_eq!(
            book.market_liquidity(&FixedBytes::repeat_byte(1)),
            (U256::from(100u64), 1)
        );

        book.remove(&OrderKey::new(FixedBytes::repeat_byte(2), U256::from(1u64)));
        assert!(book.maker_orders(&Address::with_last_byte(8)).is_empty());
        assert_eq!(book.active_markets(), vec![FixedBytes::repeat_byte(1)]);
    }
}
