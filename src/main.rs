use orderbook_api::{ApiConfig, ApiContext, ApiServer};
use orderbook_core::calls::OrderCalls;
use orderbook_core::IndexerConfig;
use orderbook_metrics::{MetricsConfig, MetricsServer};
use orderbook_oracle::PriceUpdateClient;
use orderbook_store::BookStore;
use orderbook_sync::SyncEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn, Level};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file (ignore if not found)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(Level::INFO.into())
                .add_directive("orderbook_sync=info".parse()?)
                .add_directive("orderbook_processor=info".parse()?),
        )
        .init();

    info!("Order-book indexer starting...");

    let config = match IndexerConfig::load() {
        Ok(config) => {
            info!(
                chain_id = config.chain_id,
                exchange = ?config.exchange,
                start_block = config.start_block,
                markets = config.markets.len(),
                "Configuration loaded from deployment"
            );
            config
        }
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    let store = Arc::new(BookStore::new(
        config.trade_history_cap,
        Duration::from_secs(config.decimals_ttl_secs),
    ));

    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

    let ctrl_c_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown signal received (Ctrl+C)");
        ctrl_c_tx.send(()).ok();
    });

    let metrics_config = MetricsConfig::from_env();
    if metrics_config.enabled {
        match orderbook_metrics::init() {
            Ok(handle) => {
                let metrics_server = MetricsServer::new(metrics_config, handle);
                tokio::spawn(async move {
                    if let Err(e) = metrics_server.run().await {
                        error!(error = %e, "Metrics server error");
                    }
                });
            }
            Err(e) => warn!(error = %e, "Failed to install metrics recorder"),
        }
    }

    let engine = match SyncEngine::new(config.clone(), store.clone()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!(error = %e, "Failed to create sync engine");
            std::process::exit(1);
        }
    };

    if !config.oracle.is_configured() {
        warn!("ORACLE_URL not set, priceUpdateData is disabled");
    }
    let oracle = match PriceUpdateClient::from_config(&config.oracle) {
        Ok(oracle) => oracle,
        Err(e) => {
            warn!(error = %e, "Price-update client unavailable");
            None
        }
    };

    let api_context = ApiContext::new(store.clone(), OrderCalls::new(config.exchange))
        .with_oracle(oracle)
        .with_tokens(engine.tokens().clone())
        .with_history(engine.trade_lookup());
    let api_server = ApiServer::new(ApiConfig::from_env(), api_context);
    let api_shutdown = shutdown_tx.subscribe();
    tokio::spawn(async move {
        if let Err(e) = api_server.run(api_shutdown).await {
            error!(error = %e, "API server error");
        }
    });

    let status_engine = engine.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            status_engine.print_status().await;
        }
    });

    if let Err(e) = engine.run(shutdown_rx).await {
        error!(error = %e, "Sync engine error");
        shutdown_tx.send(()).ok();
        std::process::exit(1);
    }

    info!("Order-book indexer shutdown complete");
    Ok(())
}
