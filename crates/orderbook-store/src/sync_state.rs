/// Current sync mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncMode {
    /// Initial snapshot not committed yet
    #[default]
    Historical,
    /// Snapshot committed, live watcher applying deltas
    Live,
    /// Periodic resync in flight; live batches keep flowing
    Resyncing,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Live => "live",
            Self::Resyncing => "resyncing",
        }
    }
}

/// Whether the RPC endpoint serves the configured chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetworkStatus {
    #[default]
    Unknown,
    Connected { chain_id: u64 },
    WrongNetwork { expected: u64, actual: u64 },
}

impl NetworkStatus {
    pub fn is_wrong_network(&self) -> bool {
        matches!(self, Self::WrongNetwork { .. })
    }
}

/// Sync statistics
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub snapshots_committed: u64,
    pub snapshots_failed: u64,
    pub live_batches_applied: u64,
    pub live_batches_discarded: u64,
    pub live_events_applied: u64,
    pub live_events_discarded: u64,
    pub markets_discovered: u64,
    pub fills_recorded: u64,
}

/// Sync status surfaced to readers. Failures are recorded here and never
/// clear the committed book.
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    pub mode: SyncMode,
    pub network: NetworkStatus,
    /// Last block covered by the committed snapshot
    pub cutover_block: Option<u64>,
    /// Last block the live watcher has applied
    pub live_block: Option<u64>,
    /// Unix millis of the last committed snapshot
    pub last_resync_at: Option<u64>,
    /// Most recent fetch or commit error, cleared by the next success
    pub last_error: Option<String>,
    pub stats: SyncStats,
}

impl SyncStatus {
    /// Record a committed snapshot
    pub fn snapshot_committed(&mut self, to_block: u64, at_millis: u64) {
        self.cutover_block = Some(to_block);
        self.live_block = Some(to_block);
        self.last_resync_at = Some(at_millis);
        self.last_error = None;
        self.mode = SyncMode::Live;
        self.stats.snapshots_committed += 1;
    }

    /// Record a failed snapshot. The mode falls back to what the book supports.
    pub fn snapshot_failed(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
        self.stats.snapshots_failed += 1;
        self.mode = if self.cutover_block.is_some() {
            SyncMode::Live
        } else {
            SyncMode::Historical
        };
    }

    pub fn resync_started(&mut self) {
        if self.cutover_block.is_some() {
            self.mode = SyncMode::Resyncing;
        }
    }

    /// Record a live batch outcome
    pub fn live_batch(&mut self, applied: usize, discarded: usize, to_block: u64) {
        self.stats.live_batches_applied += 1;
        self.stats.live_events_applied += applied as u64;
        self.stats.live_events_discarded += discarded as u64;
        self.live_block = Some(to_block);
    }

    pub fn live_batch_discarded(&mut self) {
        self.stats.live_batches_discarded += 1;
    }

    pub fn set_network(&mut self, network: NetworkStatus) {
        self.network = network;
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    /// Whether a snapshot has ever been committed
    pub fn is_ready(&self) -> bool {
        self.cutover_block.is_some()
    }
}
