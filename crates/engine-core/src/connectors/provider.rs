use async_trait::async_trait;
use std::{fmt, time::Duration};
use thiserror::Error;

/// Sampling parameters passed through to the backend unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        CompletionParams {
            temperature: 0.3,
            max_tokens: 150,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Connection refused, reset, DNS failure and the like
    Transport,
    Timeout,
    RateLimited,
    /// Any other non-success HTTP status
    Status(u16),
    MalformedResponse,
    /// The backend answered but produced no text
    EmptyResponse,
    ContentPolicy,
    Unauthorized,
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderErrorKind::Transport => f.write_str("transport"),
            ProviderErrorKind::Timeout => f.write_str("timeout"),
            ProviderErrorKind::RateLimited => f.write_str("rate limited"),
            ProviderErrorKind::Status(code) => write!(f, "status {code}"),
            ProviderErrorKind::MalformedResponse => f.write_str("malformed response"),
            ProviderErrorKind::EmptyResponse => f.write_str("empty response"),
            ProviderErrorKind::ContentPolicy => f.write_str("content policy"),
            ProviderErrorKind::Unauthorized => f.write_str("unauthorized"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{provider} error ({kind}): {message}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
    pub message: String,
    /// Server-suggested wait, when the backend sent one
    pub retry_after: Option<Duration>,
}

impl ProviderError {
    pub fn new(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        message: impl Into<String>,
    ) -> Self {
        ProviderError {
            provider: provider.into(),
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Transport, message)
    }

    pub fn timeout(provider: impl Into<String>, after: Duration) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::Timeout,
            format!("no response after {}s", after.as_secs()),
        )
    }

    pub fn rate_limited(provider: impl Into<String>, retry_after: Option<Duration>) -> Self {
        ProviderError {
            retry_after,
            ..Self::new(provider, ProviderErrorKind::RateLimited, "too many requests")
        }
    }

    pub fn status(provider: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Status(code), message)
    }

    pub fn empty(provider: impl Into<String>) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::EmptyResponse,
            "backend returned no text",
        )
    }
}

/// A text-completion backend. One call is one attempt; retrying is the
/// caller's business.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &CompletionParams,
    ) -> Result<String, ProviderError>;
}
