use crate::error::CliError;
use std::{collections::HashMap, fs, path::Path};

/// Process environment layered with an optional `.env` file.
///
/// Values from the file win over the process environment so a project can
/// pin its own API key and limits.
#[derive(Debug, Clone)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn new() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Load variables from a .env file
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)
    }

    /// Loads `.env` from the working directory when present.
    pub fn load_dotenv(&mut self) -> Result<bool, CliError> {
        let path = Path::new(".env");
        if !path.is_file() {
            return Ok(false);
        }
        self.load_from_file(path)?;
        Ok(true)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").unwrap_or(line);

            let Some((key, value)) = line.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid env file: malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Config(format!(
                    "Invalid env file: empty key at line {}",
                    line_num + 1
                )));
            }

            self.vars.insert(key.to_string(), Self::unquote_value(value));
        }

        Ok(())
    }

    fn unquote_value(value: &str) -> String {
        let value = value.trim();

        for quote in ['"', '\''] {
            if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
                return value[1..value.len() - 1].to_string();
            }
        }

        value.to_string()
    }
}

impl Default for EnvManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> EnvManager {
        EnvManager {
            vars: HashMap::new(),
        }
    }

    #[test]
    fn test_parse_basic_env() {
        let mut env = empty();
        let content = r#"
# Comment
CELLPIPE_RATE_LIMIT=30
export OPENAI_API_KEY=sk-test
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.get("CELLPIPE_RATE_LIMIT").as_deref(), Some("30"));
        assert_eq!(env.get("OPENAI_API_KEY").as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_parse_quoted_values() {
        let mut env = empty();
        let content = r#"
QUOTED="value with spaces"
SINGLE='single quoted'
EQUALS=a=b
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.get("QUOTED").as_deref(), Some("value with spaces"));
        assert_eq!(env.get("SINGLE").as_deref(), Some("single quoted"));
        assert_eq!(env.get("EQUALS").as_deref(), Some("a=b"));
    }

    #[test]
    fn test_invalid_env_format() {
        let mut env = empty();
        assert!(env.parse_env_content("INVALID LINE WITHOUT EQUALS").is_err());
        assert!(env.parse_env_content("=value").is_err());
    }

    #[test]
    fn test_file_values_override_process_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "CELLPIPE_WORKERS=2\n").unwrap();

        let mut env = empty();
        env.vars.insert("CELLPIPE_WORKERS".into(), "8".into());
        env.load_from_file(&path).unwrap();
        assert_eq!(env.get("CELLPIPE_WORKERS").as_deref(), Some("2"));
    }
}
