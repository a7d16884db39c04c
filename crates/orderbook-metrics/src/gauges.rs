use metrics::{describe_gauge, gauge};

/// Initialize gauge descriptions
pub fn init() {
    describe_gauge!(
        "orderbook_cutover_block",
        "Last block covered by the committed snapshot"
    );
    describe_gauge!(
        "orderbook_live_block",
        "Last block applied by the live watcher"
    );
    describe_gauge!(
        "orderbook_chain_head",
        "Latest block reported by the RPC endpoint"
    );
    describe_gauge!(
        "orderbook_open_orders",
        "Number of open orders in memory"
    );
    describe_gauge!(
        "orderbook_markets",
        "Number of markets in memory"
    );
    describe_gauge!(
        "orderbook_generation",
        "Snapshot generation counter"
    );
    describe_gauge!(
        "orderbook_aimd_value",
        "Current value of an adaptive fetch controller (batch size in blocks, or requests in flight)"
    );
}

pub fn set_cutover_block(block: u64) {
    gauge!("orderbook_cutover_block").set(block as f64);
}

pub fn set_live_block(block: u64) {
    gauge!("orderbook_live_block").set(block as f64);
}

pub fn set_chain_head(block: u64) {
    gauge!("orderbook_chain_head").set(block as f64);
}

/// Set open orders gauge
pub fn set_open_orders(count: usize) {
    gauge!("orderbook_open_orders").set(count as f64);
}

/// Set markets gauge
pub fn set_markets(count: usize) {
    gauge!("orderbook_markets").set(count as f64);
}

pub fn set_generation(generation: u64) {
    gauge!("orderbook_generation").set(generation as f64);
}

pub fn set_aimd_value(controller: &'static str, value: u64) {
    gauge!("orderbook_aimd_value", "controller" => controller).set(value as f64);
}
