use crate::settings::{
    ProcessingSettings, env::apply_env_overrides, error::SettingsError,
    validated::ValidatedSettings, validator::SettingsValidator,
};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const APP_DIR: &str = "cellpipe";
pub const SETTINGS_FILE: &str = "settings.json";

/// `<config_dir>/cellpipe/settings.json` for the current platform.
pub fn default_path() -> Result<PathBuf, SettingsError> {
    let config_dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
    Ok(config_dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// Reads settings from `path`. A missing file yields the defaults.
pub fn load_from(path: &Path) -> Result<ProcessingSettings, SettingsError> {
    let shown = path.display().to_string();

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %shown, "No settings file, using defaults");
            return Ok(ProcessingSettings::default());
        }
        Err(source) => {
            return Err(SettingsError::Read {
                path: shown,
                source,
            });
        }
    };

    let settings = serde_json::from_str(&contents).map_err(|source| SettingsError::Parse {
        path: shown.clone(),
        source,
    })?;
    info!(path = %shown, "Loaded settings");
    Ok(settings)
}

/// Loads from `path` (or the default location), applies environment
/// overrides and validates the result.
pub fn load(
    path: Option<&Path>,
) -> Result<(ProcessingSettings, ValidatedSettings), SettingsError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_path()?,
    };

    let mut settings = load_from(&path)?;
    apply_env_overrides(&mut settings)?;
    let validated = SettingsValidator::new(&settings).validate()?;
    Ok((settings, validated))
}

/// Writes settings as pretty JSON via a sibling temp file and rename.
pub fn save(settings: &ProcessingSettings, path: &Path) -> Result<(), SettingsError> {
    let shown = path.display().to_string();
    let write_err = |message: String| SettingsError::Write {
        path: shown.clone(),
        message,
    };

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| write_err(e.to_string()))?;

    let json = serde_json::to_string_pretty(settings).map_err(|e| write_err(e.to_string()))?;
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| write_err(e.to_string()))?;
    tmp.write_all(json.as_bytes())
        .map_err(|e| write_err(e.to_string()))?;
    tmp.persist(path).map_err(|e| write_err(e.error.to_string()))?;

    info!(path = %shown, "Saved settings");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = load_from(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, ProcessingSettings::default());
    }

    #[test]
    fn save_then_load_preserves_custom_templates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = ProcessingSettings {
            rate_limit: 42,
            ..Default::default()
        };
        settings
            .templates
            .add("Shout", "Add three exclamation marks.", false)
            .unwrap();
        save(&settings, &path).unwrap();

        let loaded = load_from(&path).unwrap();
        assert_eq!(loaded.rate_limit, 42);
        assert_eq!(loaded.templates.get("Shout"), Some("Add three exclamation marks."));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_from(&path), Err(SettingsError::Parse { .. })));
    }

    #[traced_test]
    #[test]
    fn load_applies_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"rate_limit": 45, "worker_count": 2}"#).unwrap();

        let (settings, validated) = load(Some(&path)).unwrap();
        assert_eq!(validated.worker_count, 2);
        assert_eq!(settings.rate_limit, 45);
        assert!(logs_contain("Loaded settings"));
    }
}
