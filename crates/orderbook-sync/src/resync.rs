use orderbook_core::types::MarketFilter;
use orderbook_core::{IndexerError, Result};
use orderbook_processor::{CommitOutcome, EventProcessor};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::snapshot::SnapshotBuilder;

/// Periodic full re-fetch and re-fold from the start block to the head
pub struct ResyncTask {
    builder: SnapshotBuilder,
    processor: Arc<EventProcessor>,
    start_block: u64,
    filter: MarketFilter,
    interval: Duration,
}

impl ResyncTask {
    pub fn new(
        builder: SnapshotBuilder,
        processor: Arc<EventProcessor>,
        start_block: u64,
        filter: MarketFilter,
        interval: Duration,
    ) -> Self {
        Self {
            builder,
            processor,
            start_block,
            filter,
            interval,
        }
    }

    /// Build `[start_block, head]` off-lock and commit it.
    ///
    /// On failure the committed book stays as it was and the error is
    /// recorded in the sync status.
    pub async fn resync_once(&self) -> Result<CommitOutcome> {
        self.processor.store().status.write().await.resync_started();

        let result = async {
            let head = self.builder.fetcher().source().head_block().await?;
            if head < self.start_block {
                return Err(IndexerError::Sync(format!(
                    "chain head {head} is below start block {}",
                    self.start_block
                )));
            }
            self.builder.build(self.start_block, head, &self.filter).await
        }
        .await;

        match result {
            Ok(snapshot) => Ok(self.processor.commit_snapshot(snapshot).await),
            Err(IndexerError::Shutdown) => Ok(CommitOutcome::ShuttingDown),
            Err(e) => {
                error!(error = %e, start_block = self.start_block, "Resync failed, keeping committed book");
                self.processor.record_snapshot_failure(&e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Resync every interval until shutdown. The first run is one interval
    /// out; the initial snapshot is taken by the engine.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_secs = self.interval.as_secs(), "Resync task started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    if let Ok(CommitOutcome::ShuttingDown) = self.resync_once().await {
                        break;
                    }
                }
            }
        }

        info!("Resync task stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::builder;
    use crate::source::tests::{created_log, reduced_log, MockChain};
    use orderbook_store::{BookStore, SyncMode};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn task(chain: Arc<MockChain>, start_block: u64) -> (ResyncTask, Arc<BookStore>, Arc<AtomicBool>) {
        let store = Arc::new(BookStore::default());
        let shutdown = Arc::new(AtomicBool::new(false));
        let processor = Arc::new(EventProcessor::new(store.clone(), shutdown.clone()));
        let task = ResyncTask::new(
            builder(chain),
            processor,
            start_block,
            MarketFilter::all(),
            Duration::from_secs(30),
        );
        (task, store, shutdown)
    }

    #[tokio::test]
    async fn test_resync_replaces_book() {
        let chain = Arc::new(MockChain::new(1, 50));
        chain.push(created_log(1, 1, 2, 100, 10, 1, 0));
        let (task, store, _) = task(chain.clone(), 0);

        assert_eq!(
            task.resync_once().await.unwrap(),
            CommitOutcome::Committed { generation: 1 }
        );
        assert_eq!(store.open_order_count().await, 1);

        chain.push(reduced_log(1, 1, 2, 100, 60, 2, 0));
        chain.push(created_log(1, 2, 2, 10, 61, 3, 0));
        chain.set_head(70);

        assert_eq!(
            task.resync_once().await.unwrap(),
            CommitOutcome::Committed { generation: 2 }
        );
        let state = store.state.read().await;
        assert_eq!(state.book().len(), 1);
        assert_eq!(state.cutover_block(), Some(70));
        assert_eq!(state.live_cursor(), Some(71));
        drop(state);
        assert_eq!(store.status().await.mode, SyncMode::Live);
    }

    #[tokio::test]
    async fn test_failed_resync_keeps_state() {
        let chain = Arc::new(MockChain::new(1, 50));
        chain.push(created_log(1, 1, 2, 100, 10, 1, 0));
        let (task, store, _) = task(chain.clone(), 0);
        task.resync_once().await.unwrap();

        chain.fail_next("execution reverted");
        assert!(task.resync_once().await.is_err());

        assert_eq!(store.open_order_count().await, 1);
        let status = store.status().await;
        assert_eq!(status.mode, SyncMode::Live);
        assert_eq!(status.cutover_block, Some(50));
        assert!(status.last_error.is_some());
        assert_eq!(store.generation().await, 1);
    }

    #[tokio::test]
    async fn test_head_below_start_is_an_error() {
        let chain = Arc::new(MockChain::new(1, 5));
        let (task, store, _) = task(chain, 10);
        assert!(matches!(task.resync_once().await, Err(IndexerError::Sync(_))));
        assert!(!store.status().await.is_ready());
    }

    #[tokio::test]
    async fn test_shutdown_skips_commit() {
        let chain = Arc::new(MockChain::new(1, 50));
        chain.push(created_log(1, 1, 2, 100, 10, 1, 0));
        let (task, store, shutdown) = task(chain, 0);
        shutdown.store(true, Ordering::SeqCst);

        assert_eq!(task.resync_once().await.unwrap(), CommitOutcome::ShuttingDown);
        assert_eq!(store.generation().await, 0);
        assert_eq!(store.status().await.stats.snapshots_failed, 0);
    }
}
