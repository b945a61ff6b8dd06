//! chatrelay-core - conversation relay with provider fallback
//!
//! This crate provides:
//! - The conversation data model accepted from the frontend
//! - The [`ChatProvider`] capability with Gemini and OpenRouter implementations
//! - [`ChatRelay`], which tries each provider tier in order and returns one normalized result

pub mod error;
pub mod providers;
pub mod relay;
pub mod types;

pub use error::{ProviderError, RelayError};
pub use providers::{ChatProvider, GeminiProvider, OpenRouterProvider};
pub use relay::{Attempt, ChatRelay, FAILURE_MESSAGE};
pub use types::{ConversationTurn, Part, RelayOutcome, RelayRequest, RelayResult, TurnRole};
