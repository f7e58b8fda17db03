use engine_core::connectors::provider::ProviderError;
use reqwest::{Client, header::HeaderMap};
use std::time::Duration;

pub mod ollama;
pub mod openai;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

pub(crate) fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// `Retry-After` in seconds, fractional values allowed. HTTP-date forms are
/// ignored.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

pub(crate) fn from_reqwest(provider: &str, err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout(provider, timeout)
    } else if err.is_decode() {
        ProviderError::new(
            provider,
            engine_core::connectors::provider::ProviderErrorKind::MalformedResponse,
            err.to_string(),
        )
    } else {
        ProviderError::transport(provider, err.to_string())
    }
}
