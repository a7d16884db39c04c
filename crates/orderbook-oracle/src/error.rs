use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("Price service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Price service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed price update: {0}")]
    Decode(String),

    #[error("No price feed ids requested")]
    NoFeeds,
}

pub type Result<T> = std::result::Result<T, OracleError>;
