//! HTTP wire shapes served by the gateway

use serde::{Deserialize, Serialize};

/// Plain-text body for non-POST calls to the chat endpoint
pub const METHOD_NOT_ALLOWED_BODY: &str = "Method Not Allowed";

/// Default route of the chat endpoint
pub const DEFAULT_CHAT_PATH: &str = "/chat";

/// Route of the status endpoint
pub const STATUS_PATH: &str = "/api/status";

/// Response of the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBody {
    pub status: String,
    pub providers: Vec<ProviderStatus>,
    pub uptime_secs: u64,
}

/// One provider tier as reported by the status endpoint. Never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub name: String,
    pub model: String,
    pub configured: bool,
}
