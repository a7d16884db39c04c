mod decimals;
mod fold;
mod markets;
mod orders;
mod seen;
mod store;
mod sync_state;
mod trades;

pub use decimals::DecimalsCache;
pub use fold::{FoldStats, SnapshotFold};
pub use markets::MarketStore;
pub use orders::{DeltaOutcome, OrderBook};
pub use seen::SeenEvents;
pub use store::{Admission, BookState, BookStore, SEEN_RETENTION_BLOCKS};
pub use sync_state::{NetworkStatus, SyncMode, SyncStats, SyncStatus};
pub use trades::{TradeHistory, TradeStore};
