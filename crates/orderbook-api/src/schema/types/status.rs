use async_graphql::SimpleObject;
use orderbook_store::{NetworkStatus, SyncStats, SyncStatus};

#[derive(Debug, Clone, SimpleObject)]
pub struct GqlSyncStats {
    pub snapshots_committed: u64,
    pub snapshots_failed: u64,
    pub live_batches_applied: u64,
    pub live_batches_discarded: u64,
    pub live_events_applied: u64,
    pub live_events_discarded: u64,
    pub markets_discovered: u64,
    pub fills_recorded: u64,
}

impl From<SyncStats> for GqlSyncStats {
    fn from(stats: SyncStats) -> Self {
        Self {
            snapshots_committed: stats.snapshots_committed,
            snapshots_failed: stats.snapshots_failed,
            live_batches_applied: stats.live_batches_applied,
            live_batches_discarded: stats.live_batches_discarded,
            live_events_applied: stats.live_events_applied,
            live_events_discarded: stats.live_events_discarded,
            markets_discovered: stats.markets_discovered,
            fills_recorded: stats.fills_recorded,
        }
    }
}

/// Sync status. `wrongNetwork` is reported apart from `lastError`.
#[derive(Debug, Clone, SimpleObject)]
pub struct GqlSyncStatus {
    pub mode: String,
    pub ready: bool,
    pub chain_id: Option<u64>,
    pub wrong_network: bool,
    pub expected_chain_id: Option<u64>,
    pub cutover_block: Option<u64>,
    pub live_block: Option<u64>,
    /// Unix millis
    pub last_resync_at: Option<u64>,
    pub last_error: Option<String>,
    pub generation: u64,
    pub open_orders: u64,
    pub markets: u64,
    pub stats: GqlSyncStats,
}

impl GqlSyncStatus {
    pub fn new(status: SyncStatus, generation: u64, open_orders: usize, markets: usize) -> Self {
        let (chain_id, expected_chain_id) = match status.network {
            NetworkStatus::Unknown => (None, None),
            NetworkStatus::Connected { chain_id } => (Some(chain_id), None),
            NetworkStatus::WrongNetwork { expected, actual } => (Some(actual), Some(expected)),
        };

        Self {
            mode: status.mode.as_str().to_string(),
            ready: status.is_ready(),
            chain_id,
            wrong_network: status.network.is_wrong_network(),
            expected_chain_id,
            cutover_block: status.cutover_block,
            live_block: status.live_block,
            last_resync_at: status.last_resync_at,
            last_error: status.last_error,
            generation,
            open_orders: open_orders as u64,
            markets: markets as u64,
            stats: status.stats.into(),
        }
    }
}
