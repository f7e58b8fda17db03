use connectors::{
    error::ConnectorError,
    file::{csv::CsvStore, xlsx::XlsxStore},
    llm::{OllamaProvider, OpenAiProvider},
};
use engine_config::settings::{ApiType, ProcessingSettings, ValidatedSettings};
use engine_core::connectors::{provider::CompletionProvider, store::TableStore};
use std::{path::Path, sync::Arc};
use tracing::info;

/// Builds the completion backend selected in settings.
pub fn create_provider(
    settings: &ProcessingSettings,
    validated: &ValidatedSettings,
) -> Result<Arc<dyn CompletionProvider>, ConnectorError> {
    let provider: Arc<dyn CompletionProvider> = match settings.api_type {
        ApiType::OpenAi => {
            let api_key = settings
                .api_key
                .clone()
                .ok_or_else(|| ConnectorError::MissingProperty("OPENAI_API_KEY".into()))?;
            let mut provider = OpenAiProvider::new(api_key, &settings.model)?
                .with_timeout(validated.request_timeout)?;
            if let Some(base_url) = &settings.openai_base_url {
                provider = provider.with_base_url(base_url);
            }
            Arc::new(provider)
        }
        ApiType::Ollama => Arc::new(
            OllamaProvider::new(&settings.ollama_url, &settings.ollama_model)?
                .with_timeout(validated.request_timeout)?,
        ),
    };

    info!(
        backend = %settings.api_type,
        model = settings.active_model(),
        "Completion provider ready"
    );
    Ok(provider)
}

/// Picks a table store from the file extension.
pub fn create_store(path: &Path) -> Result<Arc<dyn TableStore>, ConnectorError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => Ok(Arc::new(CsvStore::new(path))),
        "tsv" => Ok(Arc::new(CsvStore::new(path).with_delimiter(b'\t'))),
        "xlsx" | "xlsm" => Ok(Arc::new(XlsxStore::new(path))),
        other => Err(ConnectorError::Unsupported(format!(
            "'{}' (extension '{other}')",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_config::settings::validator::SettingsValidator;

    #[test]
    fn openai_without_key_is_rejected() {
        let settings = ProcessingSettings::default();
        let validated = SettingsValidator::new(&settings).validate().unwrap();
        assert!(matches!(
            create_provider(&settings, &validated),
            Err(ConnectorError::MissingProperty(_))
        ));
    }

    #[test]
    fn ollama_needs_no_key() {
        let settings = ProcessingSettings {
            api_type: ApiType::Ollama,
            ..Default::default()
        };
        let validated = SettingsValidator::new(&settings).validate().unwrap();
        let provider = create_provider(&settings, &validated).unwrap();
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn store_follows_extension() {
        assert!(create_store(Path::new("data.csv")).is_ok());
        assert!(create_store(Path::new("data.TSV")).is_ok());
        assert_eq!(
            create_store(Path::new("book.xlsx")).unwrap().location(),
            "book.xlsx"
        );
        assert!(create_store(Path::new("macros.XLSM")).is_ok());
        assert!(matches!(
            create_store(Path::new("legacy.xls")),
            Err(ConnectorError::Unsupported(_))
        ));
    }
}
