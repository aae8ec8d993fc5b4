//! Message types exchanged with the generative-text service.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// The person browsing the portfolio.
    Visitor,
    /// The model answering on the owner's behalf.
    Assistant,
}

/// One entry of the history replayed to the service on every turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatContent {
    pub role: Role,
    pub text: String,
}

impl ChatContent {
    /// Create a visitor entry.
    pub fn visitor(text: impl Into<String>) -> Self {
        Self {
            role: Role::Visitor,
            text: text.into(),
        }
    }

    /// Create an assistant entry.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}
