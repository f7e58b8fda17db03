use crate::file::csv::error::FileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    /// An unsupported provider or file format was requested.
    #[error("Unsupported connector: {0}")]
    Unsupported(String),

    /// A required setting such as an API key is absent.
    #[error("Missing required property: {0}")]
    MissingProperty(String),

    #[error("File error: {0}")]
    File(#[from] FileError),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
