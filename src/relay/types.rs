//! Wire types for the widget-facing relay and the upstream API.

use serde::{Deserialize, Serialize};

/// Body posted by the chat widget.
///
/// A missing `message` deserializes to an empty string, which the handler
/// rejects the same way as an explicitly empty one.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub message: String,
}

impl RelayRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body returned to the widget, on success and on upstream failure alike.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RelayResponse {
    pub reply: String,
}

/// `generateContent` request body.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

/// One conversational turn.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// A text part of a turn.
#[derive(Debug, Clone, Serialize)]
pub struct Part {
    pub text: String,
}

impl GenerateContentRequest {
    /// A request carrying `text` as the only turn, with role `user`.
    ///
    /// No history is ever attached; every relay call is independent.
    pub fn single_user_turn(text: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text: text.into() }],
            }],
        }
    }
}
