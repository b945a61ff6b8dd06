//! Chat provider abstraction
//!
//! Each upstream API implements [`ChatProvider`]; [`crate::ChatRelay`] holds them
//! in fallback order. Gemini is the primary tier and OpenRouter the secondary.

pub mod gemini;
pub mod openrouter;

pub use gemini::GeminiProvider;
pub use openrouter::OpenRouterProvider;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::ProviderError;
use crate::types::ConversationTurn;

/// Trait that every fallback tier implements
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider label used in logs and the status endpoint (e.g. "gemini")
    fn provider_name(&self) -> &str;

    /// Model identifier sent upstream
    fn model(&self) -> &str;

    /// Whether a credential is present. Unconfigured tiers are skipped.
    fn is_configured(&self) -> bool;

    /// Deliver the conversation and return the reply text
    async fn send(&self, conversation: &[ConversationTurn]) -> Result<String, ProviderError>;
}

/// Treat an empty or blank credential the same as a missing one
pub(crate) fn normalize_credential(api_key: Option<String>) -> Option<String> {
    api_key.filter(|key| !key.trim().is_empty())
}

/// Check the status, then decode the body as `T`
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ProviderError::Status { status, body });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ProviderError::MalformedPayload)
}

/// Keep only non-empty reply text
pub(crate) fn non_empty(text: Option<String>, path: &'static str) -> Result<String, ProviderError> {
    match text {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ProviderError::EmptyReply { path }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_credential() {
        assert_eq!(normalize_credential(None), None);
        assert_eq!(normalize_credential(Some(String::new())), None);
        assert_eq!(normalize_credential(Some("   ".to_string())), None);
        assert_eq!(
            normalize_credential(Some("key".to_string())),
            Some("key".to_string())
        );
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("hi".to_string()), "x").unwrap(), "hi");
        assert!(matches!(
            non_empty(Some(String::new()), "x"),
            Err(ProviderError::EmptyReply { path: "x" })
        ));
        assert!(non_empty(None, "x").is_err());
    }
}
