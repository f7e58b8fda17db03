use crate::settings::{ProcessingSettings, error::SettingsError};
use std::str::FromStr;
use tracing::debug;

pub const ENV_RATE_LIMIT: &str = "CELLPIPE_RATE_LIMIT";
pub const ENV_BATCH_SIZE: &str = "CELLPIPE_BATCH_SIZE";
pub const ENV_MAX_RETRIES: &str = "CELLPIPE_MAX_RETRIES";
pub const ENV_WORKERS: &str = "CELLPIPE_WORKERS";
pub const ENV_AUTO_SAVE: &str = "CELLPIPE_AUTO_SAVE";
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";

/// Applies overrides from the process environment.
pub fn apply_env_overrides(settings: &mut ProcessingSettings) -> Result<(), SettingsError> {
    apply_overrides_from(settings, |var| std::env::var(var).ok())
}

/// Applies overrides using `lookup` as the variable source. Blank values are
/// treated as unset.
pub fn apply_overrides_from<F>(
    settings: &mut ProcessingSettings,
    lookup: F,
) -> Result<(), SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

    if let Some(value) = get(ENV_RATE_LIMIT) {
        settings.rate_limit = parse(ENV_RATE_LIMIT, &value)?;
    }
    if let Some(value) = get(ENV_BATCH_SIZE) {
        settings.batch_size = parse(ENV_BATCH_SIZE, &value)?;
    }
    if let Some(value) = get(ENV_MAX_RETRIES) {
        settings.max_retries = parse(ENV_MAX_RETRIES, &value)?;
    }
    if let Some(value) = get(ENV_WORKERS) {
        settings.worker_count = parse(ENV_WORKERS, &value)?;
    }
    if let Some(value) = get(ENV_AUTO_SAVE) {
        settings.auto_save = parse_bool(ENV_AUTO_SAVE, &value)?;
    }
    if let Some(value) = get(ENV_API_KEY) {
        settings.api_key = Some(value.trim().to_string());
    }

    Ok(())
}

fn parse<T: FromStr>(var: &str, value: &str) -> Result<T, SettingsError> {
    debug!(var, "Applying environment override");
    value.trim().parse().map_err(|_| SettingsError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(var: &str, value: &str) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
        }),
    }
}
