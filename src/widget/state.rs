//! Widget state enums.

use strum::Display;

/// Observable state of the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum WidgetState {
    Closed,
    OpenIdle,
    /// A request is in flight.
    OpenAwaiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Closed,
    Open,
}

/// Whether the session behind the widget can take submissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Not mounted yet.
    Initializing,
    Ready,
    /// Session creation failed; submissions stay disabled.
    Failed(String),
}

/// Why a submission was not accepted. A rejected submission changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejection {
    #[error("input is empty")]
    EmptyInput,
    #[error("a reply is still streaming")]
    Busy,
    #[error("the chat session is not available")]
    SessionUnavailable,
    #[error("the chat panel is closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_display_as_kebab_case() {
        assert_eq!(WidgetState::OpenAwaiting.to_string(), "open-awaiting");
        assert_eq!(WidgetState::Closed.to_string(), "closed");
    }
}
