//! Angel One-specific error types

use thiserror::Error;

use crate::error::MarketDataError;

#[derive(Debug, Error)]
pub enum AngelError {
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Auth error: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not logged in")]
    NotLoggedIn,
}

pub type AngelResult<T> = Result<T, AngelError>;

impl From<AngelError> for MarketDataError {
    fn from(err: AngelError) -> Self {
        match err {
            AngelError::Parse(msg) => MarketDataError::Parse(msg),
            other => MarketDataError::Request(other.to_string()),
        }
    }
}
