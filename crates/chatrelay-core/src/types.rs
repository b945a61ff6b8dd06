//! Conversation and result types shared by the relay and its providers

use serde::{Deserialize, Serialize};

/// Who authored a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// A single text part within a turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// One message in the chat history, in Gemini's native shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub parts: Vec<Part>,
}

/// Body accepted on the chat endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRequest {
    /// Chronological conversation history
    pub contents: Vec<ConversationTurn>,
}

/// Normalized result returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelayResult {
    Reply { reply: String },
    Failure { error: String },
}

/// Transport-neutral outcome of one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The invocation did not use POST; nothing was parsed or sent
    MethodNotAllowed,
    Completed(RelayResult),
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            parts: vec![Part { text: text.into() }],
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            parts: vec![Part { text: text.into() }],
        }
    }

    /// Text of the first part, if the turn has any parts
    pub fn first_text(&self) -> Option<&str> {
        self.parts.first().map(|p| p.text.as_str())
    }
}

impl RelayResult {
    pub fn is_reply(&self) -> bool {
        matches!(self, Self::Reply { .. })
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Model => write!(f, "model"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_role_display() {
        assert_eq!(TurnRole::User.to_string(), "user");
        assert_eq!(TurnRole::Model.to_string(), "model");
    }

    #[test]
    fn test_parse_relay_request() {
        let req: RelayRequest = serde_json::from_str(
            r#"{"contents":[{"role":"user","parts":[{"text":"hi"}]},{"role":"model","parts":[{"text":"hello"},{"text":"again"}]}]}"#,
        )
        .unwrap();
        assert_eq!(req.contents.len(), 2);
        assert_eq!(req.contents[0].role, TurnRole::User);
        assert_eq!(req.contents[1].role, TurnRole::Model);
        assert_eq!(req.contents[1].parts.len(), 2);
        assert_eq!(req.contents[1].first_text(), Some("hello"));
    }

    #[test]
    fn test_parse_rejects_unknown_role() {
        let result: Result<RelayRequest, _> =
            serde_json::from_str(r#"{"contents":[{"role":"system","parts":[{"text":"x"}]}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rejects_missing_contents() {
        let result: Result<RelayRequest, _> = serde_json::from_str(r#"{"messages":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_turn_serializes_in_native_shape() {
        let value = serde_json::to_value(ConversationTurn::model("ok")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"role": "model", "parts": [{"text": "ok"}]})
        );
    }

    #[test]
    fn test_first_text_empty_parts() {
        let turn = ConversationTurn {
            role: TurnRole::User,
            parts: vec![],
        };
        assert_eq!(turn.first_text(), None);
    }

    #[test]
    fn test_relay_result_wire_shape() {
        let reply = RelayResult::Reply {
            reply: "hello".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            serde_json::json!({"reply": "hello"})
        );
        assert!(reply.is_reply());

        let failure = RelayResult::Failure {
            error: "oops".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            serde_json::json!({"error": "oops"})
        );
        assert!(!failure.is_reply());
    }
}
