use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// AIMD tuning for one controlled quantity
#[derive(Debug, Clone)]
pub struct AimdConfig {
    pub initial: u64,
    /// Floor
    pub min: u64,
    /// Ceiling
    pub max: u64,
    /// Multiplier applied on error (0.5 halves)
    pub decrease_factor: f64,
    /// Fractional growth after enough successes (0.1 grows by 10%)
    pub increase_factor: f64,
    /// Consecutive successes before growing
    pub success_threshold: u32,
}

impl AimdConfig {
    /// Read `{PREFIX}_INITIAL`, `{PREFIX}_MIN`, `{PREFIX}_MAX`,
    /// `{PREFIX}_DECREASE_FACTOR`, `{PREFIX}_INCREASE_FACTOR` and
    /// `{PREFIX}_SUCCESS_THRESHOLD`, falling back to `defaults`
    pub fn from_env(prefix: &str, defaults: AimdConfig) -> Self {
        fn var<T: std::str::FromStr>(prefix: &str, name: &str, default: T) -> T {
            std::env::var(format!("{prefix}_{name}"))
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        }

        Self {
            initial: var(prefix, "INITIAL", defaults.initial),
            min: var(prefix, "MIN", defaults.min),
            max: var(prefix, "MAX", defaults.max),
            decrease_factor: var(prefix, "DECREASE_FACTOR", defaults.decrease_factor),
            increase_factor: var(prefix, "INCREASE_FACTOR", defaults.increase_factor),
            success_threshold: var(prefix, "SUCCESS_THRESHOLD", defaults.success_threshold),
        }
    }

    /// Blocks per `eth_getLogs` chunk, from `BATCH_SIZE_*`
    pub fn batch_size() -> Self {
        Self::from_env(
            "BATCH_SIZE",
            Self {
                initial: 10_000,
                min: 10,
                max: 10_000,
                decrease_factor: 0.5,
                increase_factor: 0.1,
                success_threshold: 10,
            },
        )
    }

    /// Chunks in flight at once, from `CONCURRENCY_*`
    pub fn concurrency() -> Self {
        Self::from_env(
            "CONCURRENCY",
            Self {
                initial: 10,
                min: 1,
                max: 20,
                decrease_factor: 0.5,
                increase_factor: 0.1,
                success_threshold: 20,
            },
        )
    }
}

/// AIMD (Additive Increase, Multiplicative Decrease) controller,
/// the same algorithm as TCP congestion control
pub struct AimdController {
    name: &'static str,
    current: AtomicU64,
    success_count: AtomicU32,
    config: AimdConfig,
}

impl AimdController {
    pub fn new(name: &'static str, config: AimdConfig) -> Self {
        let min = config.min.max(1);
        let max = config.max.max(min);
        let initial = config.initial.clamp(min, max);
        info!(
            controller = name,
            initial = initial,
            min = min,
            max = max,
            decrease_factor = config.decrease_factor,
            increase_factor = config.increase_factor,
            success_threshold = config.success_threshold,
            "AIMD controller initialized"
        );
        Self {
            name,
            current: AtomicU64::new(initial),
            success_count: AtomicU32::new(0),
            config: AimdConfig { min, max, ..config },
        }
    }

    pub fn get(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    /// After `success_threshold` consecutive successes, grow by `increase_factor` (at least 1)
    pub fn report_success(&self) {
        let count = self.success_count.fetch_add(1, Ordering::Relaxed) + 1;
        if count < self.config.success_threshold {
            return;
        }

        self.success_count.store(0, Ordering::Relaxed);
        let current = self.current.load(Ordering::Relaxed);
        let increase = (current as f64 * self.config.increase_factor).max(1.0) as u64;
        let next = current.saturating_add(increase).min(self.config.max);

        if next > current {
            self.current.store(next, Ordering::Relaxed);
            orderbook_metrics::gauges::set_aimd_value(self.name, next);
            debug!(controller = self.name, from = current, to = next, "Increased");
        }
    }

    /// Shrink immediately by `decrease_factor`
    pub fn report_error(&self) {
        self.success_count.store(0, Ordering::Relaxed);
        let current = self.current.load(Ordering::Relaxed);
        let next = ((current as f64 * self.config.decrease_factor) as u64).max(self.config.min);

        if next < current {
            self.current.store(next, Ordering::Relaxed);
            orderbook_metrics::gauges::set_aimd_value(self.name, next);
            warn!(controller = self.name, from = current, to = next, "Decreased (multiplicative)");
        }
    }

    /// Completed with retries: neither grows nor shrinks, but resets the streak
    pub fn report_partial_success(&self) {
        self.success_count.store(0, Ordering::Relaxed);
    }
}
