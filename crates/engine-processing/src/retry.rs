use engine_core::{
    connectors::provider::{ProviderError, ProviderErrorKind},
    retry::RetryDisposition,
};

/// Logical refusals stop immediately; everything else is worth another try.
pub fn classify_provider_error(err: &ProviderError) -> RetryDisposition {
    match err.kind {
        ProviderErrorKind::ContentPolicy | ProviderErrorKind::Unauthorized => {
            RetryDisposition::Stop
        }
        ProviderErrorKind::Status(code) => classify_status(code),
        ProviderErrorKind::Transport
        | ProviderErrorKind::Timeout
        | ProviderErrorKind::RateLimited
        | ProviderErrorKind::MalformedResponse
        | ProviderErrorKind::EmptyResponse => RetryDisposition::Retry,
    }
}

fn classify_status(code: u16) -> RetryDisposition {
    match code {
        401 | 403 => RetryDisposition::Stop,
        _ => RetryDisposition::Retry,
    }
}
