//! OpenRouter provider (secondary tier)
//!
//! Speaks the OpenAI chat-completions wire format with bearer auth.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::types::{ConversationTurn, TurnRole};

use super::{ChatProvider, non_empty, normalize_credential, read_json};

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "google/gemma-7b-it";

const REPLY_PATH: &str = "choices[0].message.content";

/// OpenRouter chat-completions provider
pub struct OpenRouterProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("configured", &self.api_key.is_some())
            .finish()
    }
}

impl OpenRouterProvider {
    pub fn new(client: Client, api_key: Option<String>, model: String, base_url: String) -> Self {
        Self {
            client,
            api_key: normalize_credential(api_key),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    /// Convert conversation turns to chat-completions messages.
    ///
    /// Only the first part of each turn is forwarded; later parts are dropped.
    fn to_messages(conversation: &[ConversationTurn]) -> Result<Vec<OpenRouterMessage<'_>>, ProviderError> {
        conversation
            .iter()
            .enumerate()
            .map(|(index, turn)| {
                let Some(content) = turn.first_text() else {
                    return Err(ProviderError::InvalidConversation { index });
                };
                let role = match turn.role {
                    TurnRole::Model => "assistant",
                    TurnRole::User => "user",
                };
                Ok(OpenRouterMessage { role, content })
            })
            .collect()
    }

    fn extract_reply(resp: OpenRouterResponse) -> Result<String, ProviderError> {
        let text = resp
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content);
        non_empty(text, REPLY_PATH)
    }
}

#[async_trait]
impl ChatProvider for OpenRouterProvider {
    fn provider_name(&self) -> &str {
        "openrouter"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn send(&self, conversation: &[ConversationTurn]) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let messages = Self::to_messages(conversation)?;

        debug!(
            "OpenRouter request: model={}, messages={}",
            self.model,
            messages.len()
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&OpenRouterRequest {
                model: &self.model,
                messages,
            })
            .send()
            .await?;

        let api_response: OpenRouterResponse = read_json(response).await?;
        debug!(
            "OpenRouter response: choices={}",
            api_response.choices.len()
        );

        Self::extract_reply(api_response)
    }
}

// ── OpenRouter wire types ──

#[derive(Debug, Serialize)]
struct OpenRouterRequest<'a> {
    model: &'a str,
    messages: Vec<OpenRouterMessage<'a>>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct OpenRouterMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    #[serde(default)]
    choices: Vec<OpenRouterChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    #[serde(default)]
    message: Option<OpenRouterResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
