pub mod config;
pub mod schema;
pub mod server;

pub use config::ApiConfig;
pub use schema::{build_schema, ApiContext, ApiSchema};
pub use server::ApiServer;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Server error: {0}")]
    Server(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;
