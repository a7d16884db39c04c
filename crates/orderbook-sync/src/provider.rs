use alloy::network::{Ethereum, TransactionBuilder};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::{Log, TransactionRequest};
use alloy_primitives::Bytes;
use async_trait::async_trait;
use orderbook_core::calls::CallRequest;
use orderbook_core::{IndexerError, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::source::{CallSource, LogQuery, LogSource};

/// Boxed provider trait for HTTP connections
pub type BoxedProvider = Arc<dyn Provider<Ethereum> + Send + Sync>;

/// HTTP JSON-RPC access to the chain
pub struct ProviderManager {
    http: BoxedProvider,
}

impl ProviderManager {
    pub fn new(http_url: &str) -> Result<Self> {
        let http_url: reqwest::Url = http_url
            .parse()
            .map_err(|e| IndexerError::Rpc(format!("Invalid HTTP URL: {}", e)))?;

        let http = ProviderBuilder::new().connect_http(http_url);

        Ok(Self {
            http: Arc::new(http),
        })
    }

    /// Get HTTP provider reference
    pub fn http(&self) -> &BoxedProvider {
        &self.http
    }
}

/// Fail with `WrongNetwork` unless the endpoint serves `expected`
pub async fn ensure_network(source: &dyn LogSource, expected: u64) -> Result<u64> {
    let actual = source.chain_id().await?;
    if actual != expected {
        return Err(IndexerError::WrongNetwork { expected, actual });
    }
    info!(chain_id = actual, "Connected to expected network");
    Ok(actual)
}

fn rpc_err(e: impl std::fmt::Display) -> IndexerError {
    IndexerError::Rpc(e.to_string())
}

#[async_trait]
impl LogSource for ProviderManager {
    async fn chain_id(&self) -> Result<u64> {
        let start = Instant::now();
        let chain_id = self.http.get_chain_id().await.map_err(rpc_err)?;
        orderbook_metrics::histograms::rpc_request_duration(start.elapsed(), "eth_chainId");
        Ok(chain_id)
    }

    async fn head_block(&self) -> Result<u64> {
        let start = Instant::now();
        let head = self.http.get_block_number().await.map_err(rpc_err)?;
        orderbook_metrics::histograms::rpc_request_duration(start.elapsed(), "eth_blockNumber");
        orderbook_metrics::gauges::set_chain_head(head);
        Ok(head)
    }

    async fn logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        let start = Instant::now();
        let logs = self.http.get_logs(&query.to_filter()).await.map_err(rpc_err)?;
        orderbook_metrics::histograms::rpc_request_duration(start.elapsed(), "eth_getLogs");
        Ok(logs)
    }
}

#[async_trait]
impl CallSource for ProviderManager {
    async fn call(&self, request: &CallRequest) -> Result<Bytes> {
        let tx = TransactionRequest::default()
            .with_to(request.to)
            .with_input(request.data.clone())
            .with_value(request.value);

        let start = Instant::now();
        let output = self
            .http
            .call(tx)
            .await
            .map_err(|e| IndexerError::Call(e.to_string()))?;
        orderbook_metrics::histograms::rpc_request_duration(start.elapsed(), "eth_call");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::MockChain;

    #[tokio::test]
    async fn test_ensure_network() {
        let chain = MockChain::new(8453, 0);
        assert_eq!(ensure_network(&chain, 8453).await.unwrap(), 8453);
        assert!(matches!(
            ensure_network(&chain, 1).await,
            Err(IndexerError::WrongNetwork {
                expected: 1,
                actual: 8453
            })
        ));
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(ProviderManager::new("not a url").is_err());
    }
}
