use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportGenerationError {
    #[error("Failed to generate report: {0}")]
    GenerationFailed(String),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write report to '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
