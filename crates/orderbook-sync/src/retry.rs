use orderbook_core::{IndexerError, SyncConfig};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

/// Rate-limit wait when the node does not say how long
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(10);

/// How a failed RPC request should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Range returned too many logs; shrink the window
    TooManyLogs,
    /// Back off for the given time and lower concurrency
    RateLimited { retry_after: Duration },
    /// Timeout or transport failure; back off and retry
    Connection,
    /// Retrying will not help
    Fatal,
}

impl ErrorClass {
    pub fn classify(error: &IndexerError) -> Self {
        let IndexerError::Rpc(msg) = error else {
            return Self::Fatal;
        };
        let msg = msg.to_lowercase();

        if is_too_many_logs_error(&msg) {
            Self::TooManyLogs
        } else if is_rate_limit_error(&msg) {
            Self::RateLimited {
                retry_after: parse_retry_seconds(&msg)
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_RATE_LIMIT_WAIT),
            }
        } else if is_connection_error(&msg) {
            Self::Connection
        } else {
            Self::Fatal
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Fatal)
    }
}

/// Range too wide for the node's result cap
pub fn is_too_many_logs_error(msg: &str) -> bool {
    msg.contains("too many logs")
        || msg.contains("-32005")
        || msg.contains("more than 10000 results")
        || msg.contains("query returned more than")
        || msg.contains("block range")
}

pub fn is_rate_limit_error(msg: &str) -> bool {
    msg.contains("rate limit")
        || msg.contains("too many requests")
        || msg.contains("429")
        || msg.contains("resource exhausted")
}

pub fn is_connection_error(msg: &str) -> bool {
    msg.contains("timeout")
        || msg.contains("timed out")
        || msg.contains("connection")
        || msg.contains("limit exceeded")
        || msg.contains("decoding")
        || msg.contains("eof")
        || msg.contains("broken pipe")
        || msg.contains("reset by peer")
        || msg.contains("error sending request")
        || msg.contains("request error")
        || msg.contains("network")
        || msg.contains("dns")
        || msg.contains("resolve")
        || msg.contains("unreachable")
        || msg.contains("502")
        || msg.contains("503")
}

fn retry_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"retry.{0,10}?(\d+)\s*(?:second|sec|s\b)",
            r"wait.{0,10}?(\d+)\s*(?:second|sec|s\b)",
            r"after\s+(\d+)\s*(?:second|sec|s\b)",
            r"(\d+)\s*(?:second|sec)s?\s*(?:delay|wait|retry)",
        ]
        .into_iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
    })
}

/// Seconds to wait, from messages like "retry after 30 seconds" or "wait 5s". At least 1.
pub fn parse_retry_seconds(msg: &str) -> Option<u64> {
    retry_patterns().iter().find_map(|re| {
        re.captures(msg)
            .and_then(|caps| caps.get(1))
            .and_then(|num| num.as_str().parse::<u64>().ok())
            .map(|secs| secs.max(1))
    })
}

/// Bounded exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            max_attempts: config.retry_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_delay_ms),
            max_delay: Duration::from_secs(30),
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}
