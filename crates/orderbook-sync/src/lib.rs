pub mod adaptive;
pub mod engine;
pub mod fetcher;
pub mod history;
pub mod live;
pub mod provider;
pub mod resync;
pub mod retry;
pub mod snapshot;
pub mod source;
pub mod tokens;

pub use engine::SyncEngine;
pub use fetcher::RangeFetcher;
pub use history::TradeLookup;
pub use live::{LiveWatcher, PollOutcome};
pub use provider::{ensure_network, BoxedProvider, ProviderManager};
pub use resync::ResyncTask;
pub use snapshot::SnapshotBuilder;
pub use source::{CallSource, LogQuery, LogSource};
pub use tokens::TokenReader;
