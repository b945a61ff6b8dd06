//! Google Gemini provider (primary tier)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::types::ConversationTurn;

use super::{ChatProvider, non_empty, normalize_credential, read_json};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash-latest";

const REPLY_PATH: &str = "candidates[0].content.parts[0].text";

/// Google Gemini `generateContent` provider
pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("configured", &self.api_key.is_some())
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(client: Client, api_key: Option<String>, model: String, base_url: String) -> Self {
        Self {
            client,
            api_key: normalize_credential(api_key),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Pull the reply out of `candidates[0].content.parts[0].text`
    fn extract_reply(resp: GeminiResponse) -> Result<String, ProviderError> {
        let text = resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text);
        non_empty(text, REPLY_PATH)
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(&self, conversation: &[ConversationTurn]) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().unwrap_or_default();

        debug!(
            "Gemini request: model={}, contents={}",
            self.model,
            conversation.len()
        );

        // Turns go upstream untouched; the inbound shape is Gemini's own.
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&GeminiRequest {
                contents: conversation,
            })
            .send()
            .await?;

        let api_response: GeminiResponse = read_json(response).await?;
        debug!(
            "Gemini response: candidates={}",
            api_response.candidates.len()
        );

        Self::extract_reply(api_response)
    }
}

// ── Gemini wire types ──

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: &'a [ConversationTurn],
}

#[derive(Debug, Default, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(api_key: Option<&str>) -> GeminiProvider {
        GeminiProvider::new(
            Client::new(),
            api_key.map(str::to_string),
            DEFAULT_MODEL.to_string(),
            format!("{}/", DEFAULT_BASE_URL),
        )
    }

    fn parse(raw: serde_json::Value) -> GeminiResponse {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            provider(Some("k")).endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash-latest:generateContent"
        );
    }

    #[test]
    fn test_request_passes_turns_through() {
        let turns = vec![ConversationTurn::user("hi"), ConversationTurn::model("hello")];
        let body = serde_json::to_value(GeminiRequest { contents: &turns }).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]}
                ]
            })
        );
    }

    #[test]
    fn test_extract_reply() {
        let resp = parse(serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "hello"}, {"text": "ignored"}]},
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(GeminiProvider::extract_reply(resp).unwrap(), "hello");
    }

    #[test]
    fn test_extract_reply_no_candidates() {
        let resp = parse(serde_json::json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        assert!(matches!(
            GeminiProvider::extract_reply(resp),
            Err(ProviderError::EmptyReply { .. })
        ));
    }

    #[test]
    fn test_extract_reply_candidate_without_content() {
        let resp = parse(serde_json::json!({"candidates": [{"finishReason": "SAFETY"}]}));
        assert!(GeminiProvider::extract_reply(resp).is_err());
    }

    #[test]
    fn test_extract_reply_empty_text() {
        let resp = parse(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": ""}]}}]
        }));
        assert!(GeminiProvider::extract_reply(resp).is_err());
    }

    #[test]
    fn test_blank_key_is_unconfigured() {
        assert!(!provider(Some("  ")).is_configured());
        assert!(!provider(None).is_configured());
        assert!(provider(Some("AIza-key")).is_configured());
    }

    #[test]
    fn test_gemini_provider_debug_hides_key() {
        let debug = format!("{:?}", provider(Some("AIza-secret")));
        assert!(!debug.contains("AIza-secret"));
        assert!(debug.contains("configured: true"));
    }
}
