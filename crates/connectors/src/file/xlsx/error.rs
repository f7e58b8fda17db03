use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Workbook has no worksheets: {0}")]
    NoSheets(String),
    #[error("File contains no data: {0}")]
    Empty(String),
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
    #[error("Failed to read workbook: {0}")]
    Read(#[from] calamine::Error),
    #[error("Failed to write workbook: {0}")]
    Write(#[from] umya_spreadsheet::XlsxError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to replace '{path}': {message}")]
    Persist { path: String, message: String },
}
