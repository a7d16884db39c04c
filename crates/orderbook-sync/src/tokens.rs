use alloy_primitives::{Address, U256};
use futures::future::join_all;
use orderbook_core::calls::{decode_allowance, decode_decimals, OrderCalls};
use orderbook_core::Result;
use orderbook_store::DecimalsCache;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::source::CallSource;

/// ERC-20 reads: decimals through the TTL cache, allowances straight from chain
#[derive(Clone)]
pub struct TokenReader {
    calls: Arc<dyn CallSource>,
    order_calls: OrderCalls,
    cache: Arc<DecimalsCache>,
}

impl TokenReader {
    pub fn new(calls: Arc<dyn CallSource>, exchange: Address, cache: Arc<DecimalsCache>) -> Self {
        Self {
            calls,
            order_calls: OrderCalls::new(exchange),
            cache,
        }
    }

    pub fn order_calls(&self) -> &OrderCalls {
        &self.order_calls
    }

    /// Cached decimals, read from chain on a miss
    pub async fn decimals(&self, token: Address) -> Result<u8> {
        if let Some(decimals) = self.cache.get(&token) {
            return Ok(decimals);
        }
        let raw = self.calls.call(&self.order_calls.decimals(token)).await?;
        let decimals = decode_decimals(&raw)?;
        self.cache.insert(token, decimals);
        debug!(token = %token, decimals = decimals, "Token decimals cached");
        Ok(decimals)
    }

    /// Allowance the exchange holds from `owner`
    pub async fn allowance(&self, token: Address, owner: Address) -> Result<U256> {
        let raw = self.calls.call(&self.order_calls.allowance(token, owner)).await?;
        decode_allowance(&raw)
    }

    /// Drop expired entries and load decimals for every token not cached.
    /// Returns how many were loaded.
    pub async fn refresh(&self, tokens: &[Address]) -> usize {
        let evicted = self.cache.evict_expired();
        let missing = self.cache.missing(tokens);
        if missing.is_empty() {
            return 0;
        }

        let results = join_all(missing.iter().map(|token| self.decimals(*token))).await;
        let mut loaded = 0;
        for (token, result) in missing.iter().zip(results) {
            match result {
                Ok(_) => loaded += 1,
                Err(e) => {
                    warn!(token = %token, error = %e, "Failed to read token decimals");
                    orderbook_metrics::counters::errors(1, "decimals");
                }
            }
        }
        debug!(evicted = evicted, loaded = loaded, requested = missing.len(), "Decimals cache refreshed");
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::MockChain;
    use alloy_sol_types::{sol_data, SolType};
    use std::time::Duration;

    fn reader(chain: Arc<MockChain>) -> (TokenReader, Arc<DecimalsCache>) {
        let cache = Arc::new(DecimalsCache::new(Duration::from_secs(60)));
        (
            TokenReader::new(chain, Address::with_last_byte(0xEE), cache.clone()),
            cache,
        )
    }

    #[tokio::test]
    async fn test_refresh_loads_missing_only() {
        let chain = Arc::new(MockChain::new(1, 0));
        let usdc = Address::with_last_byte(1);
        let weth = Address::with_last_byte(2);
        let broken = Address::with_last_byte(3);
        chain
            .call_results
            .lock()
            .unwrap()
            .insert(usdc, sol_data::Uint::<8>::abi_encode(&6u8).into());
        chain
            .call_results
            .lock()
            .unwrap()
            .insert(weth, sol_data::Uint::<8>::abi_encode(&18u8).into());

        let (reader, cache) = reader(chain.clone());
        cache.insert(weth, 18);

        assert_eq!(reader.refresh(&[usdc, weth, broken]).await, 1);
        assert_eq!(cache.get(&usdc), Some(6));
        assert_eq!(cache.get(&broken), None);
        assert_eq!(reader.decimals(weth).await.unwrap(), 18);
        assert!(reader.decimals(broken).await.is_err());
    }

    #[tokio::test]
    async fn test_allowance() {
        let chain = Arc::new(MockChain::new(1, 0));
        let token = Address::with_last_byte(1);
        chain
            .call_results
            .lock()
            .unwrap()
            .insert(token, sol_data::Uint::<256>::abi_encode(&U256::from(500u64)).into());

        let (reader, _) = reader(chain);
        let allowance = reader.allowance(token, Address::with_last_byte(9)).await.unwrap();
        assert_eq!(allowance, U256::from(500u64));
    }
}
