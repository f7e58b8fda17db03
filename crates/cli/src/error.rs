use connectors::error::ConnectorError;
use engine_config::{error::ReportGenerationError, settings::SettingsError};
use engine_core::{connectors::provider::ProviderError, error::StoreError};
use engine_runtime::error::{RunError, WorkflowError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Failed to run the batch: {0}")]
    Runner(#[from] RunError),

    #[error("Failed to load the workflow: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Failed to read the table: {0}")]
    Store(#[from] StoreError),

    #[error("Connection test failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Failed to write the report: {0}")]
    Report(#[from] ReportGenerationError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),
}
