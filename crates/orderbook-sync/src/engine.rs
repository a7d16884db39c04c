use alloy_primitives::Address;
use orderbook_core::types::MarketFilter;
use orderbook_core::{IndexerConfig, IndexerError, Result};
use orderbook_processor::{CommitOutcome, EventProcessor};
use orderbook_store::{BookStore, NetworkStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::fetcher::RangeFetcher;
use crate::history::TradeLookup;
use crate::live::LiveWatcher;
use crate::provider::{ensure_network, ProviderManager};
use crate::resync::ResyncTask;
use crate::retry::RetryPolicy;
use crate::snapshot::SnapshotBuilder;
use crate::source::{CallSource, LogSource};
use crate::tokens::TokenReader;

/// Orchestrates the initial snapshot, the live watcher and the periodic resync
pub struct SyncEngine {
    config: IndexerConfig,
    source: Arc<dyn LogSource>,
    store: Arc<BookStore>,
    processor: Arc<EventProcessor>,
    builder: SnapshotBuilder,
    tokens: TokenReader,
    filter: MarketFilter,
    /// Shared shutdown flag for graceful termination
    shutdown_flag: Arc<AtomicBool>,
}

impl SyncEngine {
    /// Engine over an HTTP JSON-RPC endpoint
    pub fn new(config: IndexerConfig, store: Arc<BookStore>) -> Result<Self> {
        let provider = Arc::new(ProviderManager::new(&config.rpc_url)?);
        Ok(Self::with_sources(config, store, provider.clone(), provider))
    }

    pub fn with_sources(
        config: IndexerConfig,
        store: Arc<BookStore>,
        source: Arc<dyn LogSource>,
        calls: Arc<dyn CallSource>,
    ) -> Self {
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let processor = Arc::new(EventProcessor::new(store.clone(), shutdown_flag.clone()));
        let fetcher = RangeFetcher::new(
            source.clone(),
            RetryPolicy::from_config(&config.sync),
            shutdown_flag.clone(),
        );
        let builder = SnapshotBuilder::new(fetcher, config.exchange);
        let tokens = TokenReader::new(calls, config.exchange, store.decimals.clone());
        let mut filter = MarketFilter::markets(config.markets.clone());
        if let Some(maker) = config.maker {
            filter = filter.with_maker(maker);
        }

        Self {
            config,
            source,
            store,
            processor,
            builder,
            tokens,
            filter,
            shutdown_flag,
        }
    }

    /// Get reference to the store
    pub fn store(&self) -> &Arc<BookStore> {
        &self.store
    }

    /// Get reference to the event processor
    pub fn processor(&self) -> &Arc<EventProcessor> {
        &self.processor
    }

    pub fn tokens(&self) -> &TokenReader {
        &self.tokens
    }

    pub fn exchange(&self) -> Address {
        self.config.exchange
    }

    /// Chain-backed lookup for user histories older than the store retains
    pub fn trade_lookup(&self) -> TradeLookup {
        TradeLookup::new(self.builder.clone(), self.config.start_block)
    }

    fn resync_task(&self) -> ResyncTask {
        ResyncTask::new(
            self.builder.clone(),
            self.processor.clone(),
            self.config.start_block,
            self.filter.clone(),
            Duration::from_secs(self.config.sync.resync_interval_secs.max(1)),
        )
    }

    /// Verify the endpoint serves the configured chain and record the result.
    /// A wrong network is fatal; a transport failure only leaves the status unknown.
    pub async fn check_network(&self) -> Result<()> {
        match ensure_network(self.source.as_ref(), self.config.chain_id).await {
            Ok(chain_id) => {
                self.store
                    .status
                    .write()
                    .await
                    .set_network(NetworkStatus::Connected { chain_id });
                Ok(())
            }
            Err(IndexerError::WrongNetwork { expected, actual }) => {
                error!(expected = expected, actual = actual, "RPC endpoint serves the wrong network");
                self.store
                    .status
                    .write()
                    .await
                    .set_network(NetworkStatus::WrongNetwork { expected, actual });
                Err(IndexerError::WrongNetwork { expected, actual })
            }
            Err(e) => {
                warn!(error = %e, "Could not verify network");
                self.store.status.write().await.set_error(e.to_string());
                Ok(())
            }
        }
    }

    /// Load decimals for every known market token
    pub async fn refresh_decimals(&self) -> usize {
        self.tokens.refresh(&self.store.markets.tokens()).await
    }

    /// Run until the shutdown signal fires
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        // Spawn a task to set the shutdown flag when signal is received
        let shutdown_flag = Arc::clone(&self.shutdown_flag);
        let mut shutdown_listener = shutdown.resubscribe();
        tokio::spawn(async move {
            let _ = shutdown_listener.recv().await;
            shutdown_flag.store(true, Ordering::SeqCst);
            info!("Shutdown flag set");
        });

        self.check_network().await?;

        info!(
            start_block = self.config.start_block,
            exchange = %self.config.exchange,
            markets = self.filter.market_ids.len(),
            "Taking initial snapshot"
        );
        let resync = self.resync_task();
        match resync.resync_once().await {
            Ok(CommitOutcome::Committed { generation }) => {
                info!(generation = generation, "Initial snapshot committed, going live");
            }
            Ok(CommitOutcome::ShuttingDown) => {
                info!("Shutdown during initial snapshot, exiting");
                return Ok(());
            }
            Err(e) => {
                // the resync task retries on its interval; the live watcher idles until then
                warn!(error = %e, "Initial snapshot failed");
            }
        }
        self.refresh_decimals().await;

        let live = LiveWatcher::new(
            self.builder.fetcher().clone(),
            self.processor.clone(),
            self.config.exchange,
            self.filter.clone(),
            Duration::from_millis(self.config.sync.live_poll_interval_ms),
            self.config.sync.live_max_block_span,
        );
        let live_handle = tokio::spawn(live.run(shutdown.resubscribe()));
        let resync_handle = tokio::spawn(resync.run(shutdown.resubscribe()));

        let mut decimals_tick = tokio::time::interval(Duration::from_secs(
            self.config.sync.resync_interval_secs.max(1),
        ));
        decimals_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            select! {
                _ = shutdown.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = decimals_tick.tick() => {
                    self.refresh_decimals().await;
                }
            }
        }

        self.shutdown_flag.store(true, Ordering::SeqCst);
        for (name, handle) in [("live", live_handle), ("resync", resync_handle)] {
            if let Err(e) = handle.await {
                error!(task = name, error = %e, "Sync task panicked");
            }
        }

        info!("Sync engine shutdown complete");
        Ok(())
    }

    /// Print current sync status
    pub async fn print_status(&self) {
        let status = self.store.status().await;
        let open_orders = self.store.open_order_count().await;

        info!(
            mode = status.mode.as_str(),
            network = ?status.network,
            cutover_block = ?status.cutover_block,
            live_block = ?status.live_block,
            markets = self.store.markets.count(),
            open_orders = open_orders,
            trades = self.store.trades.count(),
            snapshots = status.stats.snapshots_committed,
            live_events = status.stats.live_events_applied,
            last_error = ?status.last_error,
            "Current status"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::{created_log, exchange, market_log, MockChain};
    use alloy_sol_types::{sol_data, SolType};
    use orderbook_core::{OracleConfig, SyncConfig};
    use orderbook_store::SyncMode;

    fn config(chain_id: u64) -> IndexerConfig {
        IndexerConfig {
            chain_id,
            rpc_url: "http://localhost:8545".to_string(),
            exchange: exchange(),
            start_block: 0,
            markets: Vec::new(),
            maker: None,
            trade_history_cap: 50,
            decimals_ttl_secs: 60,
            sync: SyncConfig {
                retry_attempts: 2,
                retry_delay_ms: 1,
                resync_interval_secs: 3600,
                live_poll_interval_ms: 10,
                live_max_block_span: 100,
            },
            oracle: OracleConfig::default(),
        }
    }

    fn engine(chain: Arc<MockChain>, chain_id: u64) -> SyncEngine {
        SyncEngine::with_sources(
            config(chain_id),
            Arc::new(BookStore::default()),
            chain.clone(),
            chain,
        )
    }

    #[tokio::test]
    async fn test_wrong_network_stops_engine() {
        let chain = Arc::new(MockChain::new(5, 10));
        let engine = engine(chain, 1);
        let (_tx, rx) = broadcast::channel(1);

        assert!(matches!(
            engine.run(rx).await,
            Err(IndexerError::WrongNetwork { expected: 1, actual: 5 })
        ));
        assert!(engine.store().status().await.network.is_wrong_network());
    }

    #[tokio::test]
    async fn test_run_snapshots_then_goes_live_until_shutdown() {
        let chain = Arc::new(MockChain::new(1, 10));
        chain.push(market_log(1, 1, 1, 0));
        chain.push(created_log(1, 1, 2, 100, 5, 2, 0));
        chain
            .call_results
            .lock()
            .unwrap()
            .insert(Address::with_last_byte(0xA0), sol_data::Uint::<8>::abi_encode(&6u8).into());

        let engine = Arc::new(engine(chain.clone(), 1));
        let (tx, rx) = broadcast::channel(1);
        let runner = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run(rx).await })
        };

        for _ in 0..200 {
            if engine.store().status().await.is_ready() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        // a block past the cutover reaches the book through the live watcher
        chain.push(created_log(1, 2, 2, 100, 11, 3, 0));
        chain.set_head(11);
        for _ in 0..200 {
            if engine.store().open_order_count().await == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(engine.store().open_order_count().await, 2);
        let status = engine.store().status().await;
        assert_eq!(status.mode, SyncMode::Live);
        assert_eq!(status.cutover_block, Some(10));
        assert_eq!(
            status.network,
            NetworkStatus::Connected { chain_id: 1 }
        );
        assert_eq!(engine.store().decimals.get(&Address::with_last_byte(0xA0)), Some(6));

        tx.send(()).unwrap();
        runner.await.unwrap().unwrap();
        assert!(engine.processor().is_shutting_down());
    }

    #[tokio::test]
    async fn test_configured_maker_narrows_book() {
        let chain = Arc::new(MockChain::new(1, 10));
        chain.push(market_log(1, 1, 1, 0));
        chain.push(created_log(1, 1, 2, 100, 5, 2, 0));
        chain.push(created_log(1, 2, 3, 100, 6, 3, 0));

        let mut config = config(1);
        config.maker = Some(Address::with_last_byte(2));
        let engine = Arc::new(SyncEngine::with_sources(
            config,
            Arc::new(BookStore::default()),
            chain.clone(),
            chain,
        ));
        let (tx, rx) = broadcast::channel(1);
        let runner = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.run(rx).await })
        };

        for _ in 0..200 {
            if engine.store().status().await.is_ready() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(engine.store().open_order_count().await, 1);
        tx.send(()).unwrap();
        runner.await.unwrap().unwrap();
    }
}
