use thiserror::Error;

/// Errors raised while loading, validating or saving processing settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings from '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings in '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write settings to '{path}': {message}")]
    Write { path: String, message: String },

    /// An environment override could not be parsed into the setting's type.
    #[error("Invalid value '{value}' for environment variable {var}")]
    InvalidEnv { var: String, value: String },

    #[error("Settings validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("No configuration directory available on this platform")]
    NoConfigDir,

    #[error("Unknown prompt template: {0}")]
    UnknownTemplate(String),

    #[error("Prompt template already exists: {0}")]
    DuplicateTemplate(String),
}
