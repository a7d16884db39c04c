use crate::error::{IndexerError, Result};
use alloy_primitives::{Address, B256};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Default cap for every trade-history list
pub const DEFAULT_TRADE_HISTORY_CAP: usize = 50;

/// Deployment configuration loaded from JSON file
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentConfig {
    #[serde(rename = "EXCHANGE")]
    pub exchange: Address,
    #[serde(rename = "startBlock")]
    pub start_block: u64,
}

/// Runtime configuration from environment variables
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub chain_id: u64,
    pub rpc_url: String,
}

/// Complete indexer configuration
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    /// Exchange contract emitting every order-book event
    pub exchange: Address,
    pub start_block: u64,
    /// Markets to track; empty means every market the exchange creates
    pub markets: Vec<B256>,
    /// Restrict the book to one maker's orders
    pub maker: Option<Address>,
    pub trade_history_cap: usize,
    pub decimals_ttl_secs: u64,
    pub sync: SyncConfig,
    pub oracle: OracleConfig,
}

/// Sync-related configuration.
/// Range chunking and request concurrency are tuned by the AIMD controllers in the sync crate.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// Period of the full re-fetch-and-refold
    pub resync_interval_secs: u64,
    pub live_poll_interval_ms: u64,
    /// Upper bound on blocks covered by one live poll
    pub live_max_block_span: u64,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self {
            retry_attempts: env_or("SYNC_RETRY_ATTEMPTS", 10),
            retry_delay_ms: env_or("SYNC_RETRY_DELAY_MS", 1000),
            resync_interval_secs: env_or("RESYNC_INTERVAL_SECS", 30),
            live_poll_interval_ms: env_or("LIVE_POLL_INTERVAL_MS", 2000),
            live_max_block_span: env_or("LIVE_MAX_BLOCK_SPAN", 1000),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 10,
            retry_delay_ms: 1000,
            resync_interval_secs: 30,
            live_poll_interval_ms: 2000,
            live_max_block_span: 1000,
        }
    }
}

/// Price-update service configuration
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Base URL of the price-update service; oracle lookups are disabled when unset
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl OracleConfig {
    pub fn from_env() -> Self {
        Self {
            url: env::var("ORACLE_URL").ok().map(sanitize_url),
            timeout_secs: env_or("ORACLE_TIMEOUT_SECS", 10),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 10,
        }
    }
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let chain_id = env::var("CHAIN_ID")
            .map_err(|_| IndexerError::MissingEnvVar("CHAIN_ID".to_string()))?
            .parse::<u64>()
            .map_err(|_| IndexerError::MissingEnvVar("CHAIN_ID (invalid format)".to_string()))?;

        let rpc_url = sanitize_url(
            env::var("RPC_URL").map_err(|_| IndexerError::MissingEnvVar("RPC_URL".to_string()))?,
        );

        eprintln!("[Config] RPC_URL: {}", rpc_url);

        Ok(Self { chain_id, rpc_url })
    }
}

impl DeploymentConfig {
    /// Load deployment configuration from JSON file
    pub fn load(chain_id: u64) -> Result<Self> {
        let path = Self::deployment_path(chain_id);
        let content = fs::read_to_string(&path)
            .map_err(|_| IndexerError::DeploymentFileNotFound(path.display().to_string()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| IndexerError::DeploymentParseError(e.to_string()))
    }

    fn deployment_path(chain_id: u64) -> PathBuf {
        PathBuf::from(format!("deployments/{}.json", chain_id))
    }
}

impl IndexerConfig {
    /// Load complete configuration from environment and deployment file
    pub fn load() -> Result<Self> {
        let env_config = EnvConfig::load()?;
        let deployment = DeploymentConfig::load(env_config.chain_id)?;

        let markets = match env::var("MARKET_IDS") {
            Ok(raw) => parse_market_ids(&raw)?,
            Err(_) => Vec::new(),
        };
        if !markets.is_empty() {
            eprintln!("[Config] Tracking {} market(s)", markets.len());
        }

        let maker = match env::var("MAKER_ADDRESS") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_maker(&raw)?),
            _ => None,
        };
        if let Some(maker) = maker {
            eprintln!("[Config] Tracking orders of maker {}", maker);
        }

        let trade_history_cap = env_or("TRADE_HISTORY_CAP", DEFAULT_TRADE_HISTORY_CAP);
        if trade_history_cap == 0 {
            return Err(IndexerError::InvalidConfig(
                "TRADE_HISTORY_CAP must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            chain_id: env_config.chain_id,
            rpc_url: env_config.rpc_url,
            exchange: deployment.exchange,
            start_block: deployment.start_block,
            markets,
            maker,
            trade_history_cap,
            decimals_ttl_secs: env_or("DECIMALS_CACHE_TTL_SECS", 3600),
            sync: SyncConfig::from_env(),
            oracle: OracleConfig::from_env(),
        })
    }
}

/// Parse the maker address the book is narrowed to
pub fn parse_maker(raw: &str) -> Result<Address> {
    let raw = raw.trim();
    raw.parse::<Address>()
        .map_err(|e| IndexerError::InvalidConfig(format!("bad maker address {raw}: {e}")))
}

/// Parse a comma-separated list of bytes32 market ids
pub fn parse_market_ids(raw: &str) -> Result<Vec<B256>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<B256>()
                .map_err(|e| IndexerError::InvalidConfig(format!("bad market id {s}: {e}")))
        })
        .collect()
}

/// Sanitize URL by removing surrounding quotes and whitespace
pub fn sanitize_url(url: String) -> String {
    let trimmed = url.trim();
    let without_quotes = if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    without_quotes.to_string()
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
