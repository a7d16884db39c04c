use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Deployment file not found: {0}")]
    DeploymentFileNotFound(String),

    #[error("Failed to parse deployment file: {0}")]
    DeploymentParseError(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Wrong network: expected chain {expected}, connected to chain {actual}")]
    WrongNetwork { expected: u64, actual: u64 },

    #[error("Event decode error: {0}")]
    EventDecode(String),

    #[error("Log is missing field: {0}")]
    MissingLogField(&'static str),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Call error: {0}")]
    Call(String),

    #[error("Sync error: {0}")]
    Sync(String),

    #[error("Shutdown requested")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, IndexerError>;
