pub mod calls;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod types;

pub use config::{IndexerConfig, OracleConfig, SyncConfig};
pub use error::{IndexerError, Result};
