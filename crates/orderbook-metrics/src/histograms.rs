use metrics::{describe_histogram, histogram};
use std::time::Duration;

/// Initialize histogram descriptions
pub fn init() {
    describe_histogram!(
        "orderbook_snapshot_duration_seconds",
        "Time to fetch and fold a full snapshot"
    );
    describe_histogram!(
        "orderbook_live_batch_duration_seconds",
        "Time to apply a live batch under the write lock"
    );
    describe_histogram!(
        "orderbook_rpc_request_duration_seconds",
        "Time for RPC requests"
    );
    describe_histogram!(
        "orderbook_oracle_request_duration_seconds",
        "Time for price-update requests"
    );
}

/// Record snapshot build duration
pub fn snapshot_duration(duration: Duration) {
    histogram!("orderbook_snapshot_duration_seconds").record(duration.as_secs_f64());
}

pub fn live_batch_duration(duration: Duration) {
    histogram!("orderbook_live_batch_duration_seconds").record(duration.as_secs_f64());
}

/// Record RPC request duration
pub fn rpc_request_duration(duration: Duration, method: &'static str) {
    histogram!("orderbook_rpc_request_duration_seconds", "method" => method)
        .record(duration.as_secs_f64());
}

pub fn oracle_request_duration(duration: Duration) {
    histogram!("orderbook_oracle_request_duration_seconds").record(duration.as_secs_f64());
}
