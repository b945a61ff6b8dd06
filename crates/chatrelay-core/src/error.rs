//! Error kinds for provider attempts and whole relay invocations

use reqwest::StatusCode;
use thiserror::Error;

/// Why a single provider attempt failed.
///
/// Every variant collapses into the same outcome for the relay: the tier failed.
/// The distinction only matters for operator logs.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection, timeout or body read failure. The URL is stripped so
    /// query-string credentials never reach the message.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("upstream responded with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("upstream payload could not be decoded: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    /// Success status, but nothing at the expected reply path
    #[error("upstream payload had no reply text at {path}")]
    EmptyReply { path: &'static str },

    /// The conversation cannot be expressed in this provider's wire shape
    #[error("conversation turn {index} has no text part")]
    InvalidConversation { index: usize },
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }
}

/// Terminal failure of a relay invocation. Never shown to the caller.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("malformed request body: {0}")]
    MalformedRequestBody(#[source] serde_json::Error),

    /// The last provider tier was attempted and failed
    #[error("provider {provider} failed: {source}")]
    ProviderFailed {
        provider: String,
        #[source]
        source: ProviderError,
    },

    /// The last provider tier had no credential configured
    #[error("all providers exhausted: no fallback credential available")]
    AllProvidersExhausted,
}

impl RelayError {
    /// Short stable label used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequestBody(_) => "malformed_request_body",
            Self::ProviderFailed { .. } => "provider_failed",
            Self::AllProvidersExhausted => "all_providers_exhausted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let err = ProviderError::Status {
            status: StatusCode::TOO_MANY_REQUESTS,
            body: "quota".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "upstream responded with status 429 Too Many Requests: quota"
        );
    }

    #[test]
    fn test_provider_failed_message_names_provider() {
        let err = RelayError::ProviderFailed {
            provider: "openrouter".to_string(),
            source: ProviderError::EmptyReply {
                path: "choices[0].message.content",
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("openrouter"));
        assert!(msg.contains("choices[0].message.content"));
        assert_eq!(err.kind(), "provider_failed");
    }

    #[test]
    fn test_error_kinds() {
        let bad_json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            RelayError::MalformedRequestBody(bad_json).kind(),
            "malformed_request_body"
        );
        assert_eq!(
            RelayError::AllProvidersExhausted.kind(),
            "all_providers_exhausted"
        );
    }
}
