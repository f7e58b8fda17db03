use connectors::error::ConnectorError;
use engine_config::settings::error::SettingsError;
use engine_core::error::StoreError;
use engine_processing::error::SetupError;
use thiserror::Error;

/// Errors that end a run before or outside per-cell processing.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Batch setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Failed to read workflow '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse workflow: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid workflow: {0}")]
    Invalid(String),

    #[error("Step '{step}' failed: {source}")]
    Step {
        step: String,
        #[source]
        source: SetupError,
    },
}
