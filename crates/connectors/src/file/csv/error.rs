use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
    #[error("File contains no data: {0}")]
    Empty(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Failed to replace '{path}': {message}")]
    PersistError { path: String, message: String },
}

impl FileError {
    pub(crate) fn from_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FileError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => FileError::PermissionDenied(path.to_string()),
            _ => FileError::IoError(err),
        }
    }
}
