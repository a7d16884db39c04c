pub mod decode;
mod handlers;
mod pipeline;

pub use decode::{decode_log, decode_logs, sort_chain_order};
pub use pipeline::{BatchOutcome, CommitOutcome, EventProcessor, LiveBatch, Snapshot};
