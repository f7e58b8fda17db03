use engine_core::error::StoreError;
use model::records::table::TableError;
use thiserror::Error;

/// Problems with a request detected before any job is dispatched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("Invalid row range: start {start} is after end {end}")]
    InvalidRange { start: usize, end: usize },

    #[error("Row range ends at {end} but the table has {rows} rows")]
    RangeOutOfBounds { end: usize, rows: usize },

    #[error("No target columns selected")]
    NoTargetColumns,

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Batch size must be at least 1")]
    ZeroBatchSize,
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to apply result to table: {0}")]
    Table(#[from] TableError),

    #[error("Failed to persist table: {0}")]
    Persist(#[from] StoreError),
}
