//! Error types for framedev

use thiserror::Error;

/// Result type alias using framedev Error
pub type Result<T> = std::result::Result<T, Error>;

/// framedev error types
///
/// An upstream frame answering with a non-2xx status is not an error: it is
/// recorded on the interaction record. Only failures that prevent a record
/// from being produced show up here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Connection-level failure (DNS, refused, timeout, truncated body).
    #[error("Network error: {0}")]
    Network(String),

    /// The resolver answered, but with an error status of its own.
    #[error("Resolver error ({status}): {message}")]
    Resolver { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid interaction: {0}")]
    InvalidInteraction(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures where no response was obtained at all.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Network(e.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::InvalidUrl(e.to_string())
    }
}
