use thiserror::Error;

/// Errors raised by a backing store while loading or persisting a table.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read '{path}': {message}")]
    Read { path: String, message: String },

    #[error("Failed to write '{path}': {message}")]
    Write { path: String, message: String },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("File contains no data: {0}")]
    Empty(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
