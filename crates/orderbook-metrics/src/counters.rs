use metrics::{counter, describe_counter};

/// Initialize counter descriptions
pub fn init() {
    describe_counter!(
        "orderbook_events_applied_total",
        "Live events applied to the book, by event kind"
    );
    describe_counter!(
        "orderbook_events_discarded_total",
        "Live events discarded, by reason (stale, duplicate, no_cutover)"
    );
    describe_counter!(
        "orderbook_logs_skipped_total",
        "Logs skipped because they could not be decoded"
    );
    describe_counter!(
        "orderbook_underflows_total",
        "Deltas larger than the remaining amount, clamped to zero"
    );
    describe_counter!(
        "orderbook_unknown_order_deltas_total",
        "Reductions or fills for orders with no known creation"
    );
    describe_counter!(
        "orderbook_resyncs_total",
        "Snapshot builds, by outcome (ok, failed, discarded)"
    );
    describe_counter!(
        "orderbook_live_batches_discarded_total",
        "Live batches dropped because a resync or shutdown overtook them"
    );
    describe_counter!(
        "orderbook_fills_recorded_total",
        "Fills retained by the trade history"
    );
    describe_counter!(
        "orderbook_markets_total",
        "Markets discovered"
    );
    describe_counter!(
        "orderbook_rpc_retries_total",
        "RPC requests retried after a retryable error"
    );
    describe_counter!(
        "orderbook_errors_total",
        "Total number of errors"
    );
}

/// Increment events applied counter
pub fn events_applied(count: u64, kind: &'static str) {
    counter!("orderbook_events_applied_total", "kind" => kind).increment(count);
}

/// Increment events discarded counter
pub fn events_discarded(count: u64, reason: &'static str) {
    counter!("orderbook_events_discarded_total", "reason" => reason).increment(count);
}

pub fn logs_skipped(count: u64) {
    counter!("orderbook_logs_skipped_total").increment(count);
}

pub fn underflows(count: u64) {
    counter!("orderbook_underflows_total").increment(count);
}

pub fn unknown_order_deltas(count: u64) {
    counter!("orderbook_unknown_order_deltas_total").increment(count);
}

/// Increment resync counter with its outcome
pub fn resyncs(outcome: &'static str) {
    counter!("orderbook_resyncs_total", "outcome" => outcome).increment(1);
}

pub fn live_batches_discarded(count: u64) {
    counter!("orderbook_live_batches_discarded_total").increment(count);
}

pub fn fills_recorded(count: u64) {
    counter!("orderbook_fills_recorded_total").increment(count);
}

pub fn markets_discovered(count: u64) {
    counter!("orderbook_markets_total").increment(count);
}

pub fn rpc_retries(count: u64) {
    counter!("orderbook_rpc_retries_total").increment(count);
}

/// Increment errors counter
pub fn errors(count: u64, error_type: &str) {
    counter!("orderbook_errors_total", "type" => error_type.to_string()).increment(count);
}
