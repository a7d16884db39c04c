use alloy::rpc::types::Log;
use futures::stream::{self, StreamExt, TryStreamExt};
use orderbook_core::{IndexerError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::adaptive::{AimdConfig, AimdController};
use crate::retry::{ErrorClass, RetryPolicy};
use crate::source::{LogQuery, LogSource};

/// Pause before retrying a halved window
const SPLIT_DELAY: Duration = Duration::from_millis(100);

/// Fetches every log matching a query over an arbitrarily wide block range.
///
/// The range is cut into chunks sized by the batch controller and fetched
/// with bounded parallelism. A chunk that trips the node's result cap is
/// halved until it fits; rate limits and transport errors back off and
/// retry. Results come back in chain order.
#[derive(Clone)]
pub struct RangeFetcher {
    source: Arc<dyn LogSource>,
    batch: Arc<AimdController>,
    concurrency: Arc<AimdController>,
    policy: RetryPolicy,
    shutdown: Arc<AtomicBool>,
}

impl RangeFetcher {
    pub fn new(source: Arc<dyn LogSource>, policy: RetryPolicy, shutdown: Arc<AtomicBool>) -> Self {
        Self::with_controllers(
            source,
            policy,
            shutdown,
            AimdController::new("batch_size", AimdConfig::batch_size()),
            AimdController::new("concurrency", AimdConfig::concurrency()),
        )
    }

    pub fn with_controllers(
        source: Arc<dyn LogSource>,
        policy: RetryPolicy,
        shutdown: Arc<AtomicBool>,
        batch: AimdController,
        concurrency: AimdController,
    ) -> Self {
        Self {
            source,
            batch: Arc::new(batch),
            concurrency: Arc::new(concurrency),
            policy,
            shutdown,
        }
    }

    pub fn source(&self) -> &Arc<dyn LogSource> {
        &self.source
    }

    pub fn batch_size(&self) -> u64 {
        self.batch.get()
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// All logs matching `query` over its full range
    pub async fn fetch(&self, query: &LogQuery) -> Result<Vec<Log>> {
        if query.from_block > query.to_block {
            return Ok(Vec::new());
        }

        let chunks = split_range(query.from_block, query.to_block, self.batch.get());
        let concurrency = self.concurrency.get().max(1) as usize;
        debug!(
            from = query.from_block,
            to = query.to_block,
            chunks = chunks.len(),
            concurrency = concurrency,
            kinds = ?query.kinds,
            "Fetching logs"
        );

        let parts: Vec<Vec<Log>> = stream::iter(chunks)
            .map(|(from, to)| self.fetch_window(query.with_range(from, to)))
            .buffered(concurrency)
            .try_collect()
            .await?;

        let mut logs: Vec<Log> = parts.into_iter().flatten().collect();
        logs.sort_by_key(|log| (log.block_number, log.log_index));
        Ok(logs)
    }

    /// Fetch one chunk, shrinking the window on too-many-logs and resuming
    /// from where the last successful sub-window ended
    async fn fetch_window(&self, query: LogQuery) -> Result<Vec<Log>> {
        let end = query.to_block;
        let mut from = query.from_block;
        let mut to = end;
        let mut attempts = 0u32;
        let mut retried = false;
        let mut logs = Vec::new();

        loop {
            if self.is_shutdown() {
                return Err(IndexerError::Shutdown);
            }
            attempts += 1;

            let error = match self.source.logs(&query.with_range(from, to)).await {
                Ok(chunk) => {
                    logs.extend(chunk);
                    if to >= end {
                        if retried {
                            info!(from = query.from_block, to = end, "Chunk fetched after retry");
                            self.batch.report_partial_success();
                            self.concurrency.report_partial_success();
                        } else {
                            self.batch.report_success();
                            self.concurrency.report_success();
                        }
                        return Ok(logs);
                    }
                    from = to + 1;
                    to = end.min(from.saturating_add(self.batch.get().max(1) - 1));
                    attempts = 0;
                    retried = false;
                    continue;
                }
                Err(e) => e,
            };

            let class = ErrorClass::classify(&error);
            if !class.is_retryable() || attempts >= self.policy.max_attempts {
                error!(from = from, to = to, attempts = attempts, error = %error, "Log fetch failed");
                orderbook_metrics::counters::errors(1, "get_logs");
                return Err(error);
            }
            retried = true;
            orderbook_metrics::counters::rpc_retries(1);

            match class {
                ErrorClass::TooManyLogs if to > from => {
                    self.batch.report_error();
                    let mid = from + (to - from) / 2;
                    warn!(from = from, to = to, new_to = mid, "Too many logs, splitting window");
                    to = mid;
                    attempts = 0;
                    tokio::time::sleep(SPLIT_DELAY).await;
                }
                ErrorClass::RateLimited { retry_after } => {
                    self.concurrency.report_error();
                    warn!(
                        from = from,
                        to = to,
                        delay_secs = retry_after.as_secs(),
                        "Rate limited, waiting"
                    );
                    tokio::time::sleep(retry_after).await;
                }
                _ => {
                    self.concurrency.report_error();
                    let delay = self.policy.backoff(attempts);
                    warn!(
                        from = from,
                        to = to,
                        attempt = attempts,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Log fetch failed, retrying with backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Cut `[from, to]` into consecutive inclusive windows of at most `size` blocks
pub fn split_range(from: u64, to: u64, size: u64) -> Vec<(u64, u64)> {
    let size = size.max(1);
    let mut ranges = Vec::new();
    let mut start = from;
    while start <= to {
        let end = to.min(start.saturating_add(size - 1));
        ranges.push((start, end));
        if end == u64::MAX {
            break;
        }
        start = end + 1;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::tests::{created_log, exchange, MockChain};
    use orderbook_core::events::EventKind;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn controller(name: &'static str, initial: u64) -> AimdController {
        AimdController::new(
            name,
            AimdConfig {
                initial,
                min: 1,
                max: initial,
                decrease_factor: 0.5,
                increase_factor: 0.1,
                success_threshold: 10,
            },
        )
    }

    fn fetcher(chain: Arc<MockChain>, batch: u64) -> RangeFetcher {
        RangeFetcher::with_controllers(
            chain,
            policy(),
            Arc::new(AtomicBool::new(false)),
            controller("batch_size", batch),
            controller("concurrency", 4),
        )
    }

    fn query(from: u64, to: u64) -> LogQuery {
        LogQuery::new(exchange(), [EventKind::OrderCreated], from, to)
    }

    #[test]
    fn test_split_range() {
        assert_eq!(split_range(1, 10, 4), vec![(1, 4), (5, 8), (9, 10)]);
        assert_eq!(split_range(5, 5, 100), vec![(5, 5)]);
        assert!(split_range(6, 5, 100).is_empty());
        assert_eq!(split_range(0, 2, 0), vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[tokio::test]
    async fn test_fetch_returns_chain_order() {
        let chain = Arc::new(MockChain::new(1, 100));
        for (i, block) in [90u64, 3, 47, 47, 12].into_iter().enumerate() {
            chain.push(created_log(1, i as u64, 2, 10, block, i as u8, 5 - i as u64));
        }

        let logs = fetcher(chain.clone(), 10).fetch(&query(0, 100)).await.unwrap();
        let positions: Vec<(Option<u64>, Option<u64>)> =
            logs.iter().map(|l| (l.block_number, l.log_index)).collect();
        assert_eq!(
            positions,
            vec![
                (Some(3), Some(4)),
                (Some(12), Some(1)),
                (Some(47), Some(2)),
                (Some(47), Some(3)),
                (Some(90), Some(5)),
            ]
        );
        assert_eq!(chain.log_calls.load(Ordering::SeqCst), 11);
    }

    #[tokio::test]
    async fn test_too_many_logs_halves_window() {
        let chain = Arc::new(MockChain {
            max_span: Some(25),
            ..MockChain::new(1, 100)
        });
        chain.push(created_log(1, 1, 2, 10, 10, 1, 0));
        chain.push(created_log(1, 2, 2, 10, 60, 2, 0));
        chain.push(created_log(1, 3, 2, 10, 99, 3, 0));

        let fetcher = fetcher(chain.clone(), 100);
        let logs = fetcher.fetch(&query(0, 99)).await.unwrap();
        assert_eq!(logs.len(), 3);
        assert!(fetcher.batch_size() < 100);
    }

    #[tokio::test]
    async fn test_clean_windows_after_split_report_success() {
        let chain = Arc::new(MockChain {
            max_span: Some(60),
            ..MockChain::new(1, 100)
        });
        chain.push(created_log(1, 1, 2, 10, 70, 1, 0));

        let concurrency = AimdController::new(
            "concurrency",
            AimdConfig {
                initial: 4,
                min: 1,
                max: 8,
                decrease_factor: 0.5,
                increase_factor: 0.1,
                success_threshold: 1,
            },
        );
        let fetcher = RangeFetcher::with_controllers(
            chain.clone(),
            policy(),
            Arc::new(AtomicBool::new(false)),
            controller("batch_size", 100),
            concurrency,
        );

        // [0, 99] splits to [0, 49], then [50, 99] succeeds on the first try
        let logs = fetcher.fetch(&query(0, 99)).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(chain.log_calls.load(Ordering::SeqCst), 3);
        assert_eq!(fetcher.batch_size(), 50);
        assert_eq!(fetcher.concurrency.get(), 5);
    }

    #[tokio::test]
    async fn test_transient_errors_retry_then_fatal_fails() {
        let chain = Arc::new(MockChain::new(1, 100));
        chain.push(created_log(1, 1, 2, 10, 5, 1, 0));
        chain.fail_next("connection reset by peer");
        let logs = fetcher(chain.clone(), 100).fetch(&query(0, 10)).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(chain.log_calls.load(Ordering::SeqCst), 2);

        chain.fail_next("invalid params");
        assert!(fetcher(chain.clone(), 100).fetch(&query(0, 10)).await.is_err());
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let chain = Arc::new(MockChain::new(1, 100));
        for _ in 0..5 {
            chain.fail_next("request timeout");
        }
        let result = fetcher(chain.clone(), 100).fetch(&query(0, 10)).await;
        assert!(matches!(result, Err(IndexerError::Rpc(_))));
        assert_eq!(chain.log_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_shutdown_stops_fetch() {
        let chain = Arc::new(MockChain::new(1, 100));
        let fetcher = RangeFetcher::with_controllers(
            chain.clone(),
            policy(),
            Arc::new(AtomicBool::new(true)),
            controller("batch_size", 10),
            controller("concurrency", 2),
        );
        assert!(matches!(
            fetcher.fetch(&query(0, 10)).await,
            Err(IndexerError::Shutdown)
        ));
        assert_eq!(chain.log_calls.load(Ordering::SeqCst), 0);
    }
}
