//! Conversation relay with ordered provider fallback

use http::Method;
use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, RelayError};
use crate::providers::ChatProvider;
use crate::types::{ConversationTurn, RelayOutcome, RelayRequest, RelayResult};

/// The only failure text callers ever see
pub const FAILURE_MESSAGE: &str = "خطایی در سرور رخ داد. لطفاً دوباره تلاش کنید.";

/// What happened at one provider tier during an invocation
#[derive(Debug)]
pub enum Attempt {
    /// No credential configured, nothing was sent
    Skipped,
    Succeeded(String),
    Failed(ProviderError),
}

/// Relays a conversation through provider tiers until one replies
pub struct ChatRelay {
    /// Providers in fallback order (index 0 = primary)
    providers: Vec<Box<dyn ChatProvider>>,
}

impl ChatRelay {
    pub fn new(providers: Vec<Box<dyn ChatProvider>>) -> Self {
        Self { providers }
    }

    /// Handle one inbound invocation end to end.
    ///
    /// Non-POST methods are rejected before the body is looked at. Every other
    /// failure is logged here and replaced by [`FAILURE_MESSAGE`].
    pub async fn handle(&self, method: &Method, body: &[u8]) -> RelayOutcome {
        if method != Method::POST {
            debug!("Rejecting {} request", method);
            return RelayOutcome::MethodNotAllowed;
        }

        let result = match self.relay_body(body).await {
            Ok(reply) => RelayResult::Reply { reply },
            Err(e) => {
                error!(kind = e.kind(), "Relay failed: {}", e);
                RelayResult::Failure {
                    error: FAILURE_MESSAGE.to_string(),
                }
            }
        };
        RelayOutcome::Completed(result)
    }

    async fn relay_body(&self, body: &[u8]) -> Result<String, RelayError> {
        let request: RelayRequest =
            serde_json::from_slice(body).map_err(RelayError::MalformedRequestBody)?;
        self.relay(&request.contents).await
    }

    /// Try each tier once, in order. The first reply wins.
    ///
    /// Failures of earlier tiers are logged and absorbed; only the outcome of
    /// the last tier decides the terminal error.
    pub async fn relay(&self, conversation: &[ConversationTurn]) -> Result<String, RelayError> {
        let mut last = None;

        for (idx, provider) in self.providers.iter().enumerate() {
            let attempt = match self.attempt(provider.as_ref(), conversation).await {
                Attempt::Succeeded(reply) => {
                    if idx > 0 {
                        info!(
                            "Request succeeded on fallback provider {} ({})",
                            provider.provider_name(),
                            provider.model()
                        );
                    }
                    return Ok(reply);
                }
                other => other,
            };

            if let Attempt::Failed(e) = &attempt {
                warn!(
                    "Provider {} ({}) failed: {}",
                    provider.provider_name(),
                    provider.model(),
                    e
                );
            } else {
                debug!(
                    "Provider {} has no credential, skipping",
                    provider.provider_name()
                );
            }

            if let Some(next) = self.providers.get(idx + 1) {
                info!(
                    "Falling back from {} to {}",
                    provider.provider_name(),
                    next.provider_name()
                );
            }
            last = Some((provider.provider_name().to_string(), attempt));
        }

        match last {
            Some((provider, Attempt::Failed(source))) => {
                Err(RelayError::ProviderFailed { provider, source })
            }
            _ => Err(RelayError::AllProvidersExhausted),
        }
    }

    async fn attempt(
        &self,
        provider: &dyn ChatProvider,
        conversation: &[ConversationTurn],
    ) -> Attempt {
        if !provider.is_configured() {
            return Attempt::Skipped;
        }

        debug!(
            "Trying provider {} ({}) with {} turns",
            provider.provider_name(),
            provider.model(),
            conversation.len()
        );
        match provider.send(conversation).await {
            Ok(reply) => Attempt::Succeeded(reply),
            Err(e) => Attempt::Failed(e),
        }
    }

    /// Providers in fallback order
    pub fn providers(&self) -> &[Box<dyn ChatProvider>] {
        &self.providers
    }

    /// Number of configured tiers
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }
}
