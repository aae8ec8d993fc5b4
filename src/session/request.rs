//! Outgoing turn requests.

/// Separator between the preamble and the visitor's first question.
pub const FRAME_SEPARATOR: &str = "\n\nUser: ";

/// One visitor turn, either framed with the preamble or sent as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnRequest {
    /// First turn of a session: the preamble constrains the assistant for
    /// the rest of the conversation.
    FramedFirstTurn { preamble: String, text: String },
    /// Every later turn, relying on the replayed history for context.
    PlainTurn { text: String },
}

impl TurnRequest {
    pub fn framed(preamble: impl Into<String>, text: impl Into<String>) -> Self {
        Self::FramedFirstTurn {
            preamble: preamble.into(),
            text: text.into(),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::PlainTurn { text: text.into() }
    }

    /// The visitor's own words.
    pub fn text(&self) -> &str {
        match self {
            Self::FramedFirstTurn { text, .. } | Self::PlainTurn { text } => text,
        }
    }

    pub fn is_framed(&self) -> bool {
        matches!(self, Self::FramedFirstTurn { .. })
    }

    /// The text actually transmitted.
    pub fn outgoing_text(&self) -> String {
        match self {
            Self::FramedFirstTurn { preamble, text } => {
                format!("{preamble}{FRAME_SEPARATOR}{text}")
            }
            Self::PlainTurn { text } => text.clone(),
        }
    }
}
