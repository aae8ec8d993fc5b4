//! In-memory transcript of the widget's conversation.
//!
//! The transcript is append-only. Visitor messages are complete on arrival;
//! assistant messages start as an empty placeholder, accumulate fragments and
//! are then either finalized or replaced by an error text. After that they
//! never change.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{FolioError, Result};
use crate::types::Role;

/// Position of a message in the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MessageId(usize);

impl MessageId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Lifecycle of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Placeholder still receiving fragments.
    Streaming,
    Complete,
    /// Replaced by an error text.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    pub status: MessageStatus,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn is_streaming(&self) -> bool {
        self.status == MessageStatus::Streaming
    }
}

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a complete visitor message.
    pub fn push_visitor(&mut self, text: impl Into<String>) -> MessageId {
        self.push(Role::Visitor, text.into(), MessageStatus::Complete)
    }

    /// Append an empty assistant message that will receive fragments.
    pub fn push_placeholder(&mut self) -> MessageId {
        self.push(Role::Assistant, String::new(), MessageStatus::Streaming)
    }

    /// Append a fragment to a streaming message.
    pub fn append_fragment(&mut self, id: MessageId, fragment: &str) -> Result<()> {
        let message = self.streaming_mut(id)?;
        message.text.push_str(fragment);
        Ok(())
    }

    /// Mark a streaming message complete.
    pub fn finalize(&mut self, id: MessageId) -> Result<()> {
        self.streaming_mut(id)?.status = MessageStatus::Complete;
        Ok(())
    }

    /// Replace a streaming message's text wholesale and mark it failed.
    pub fn fail(&mut self, id: MessageId, text: impl Into<String>) -> Result<()> {
        let message = self.streaming_mut(id)?;
        message.text = text.into();
        message.status = MessageStatus::Failed;
        Ok(())
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(id.0)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Discard everything (widget reset).
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn push(&mut self, role: Role, text: String, status: MessageStatus) -> MessageId {
        let id = MessageId(self.messages.len());
        self.messages.push(Message {
            id,
            role,
            text,
            status,
            timestamp: Utc::now(),
        });
        id
    }

    fn streaming_mut(&mut self, id: MessageId) -> Result<&mut Message> {
        let message = self
            .messages
            .get_mut(id.0)
            .ok_or_else(|| FolioError::InvalidState(format!("no message at {}", id.0)))?;
        if !message.is_streaming() {
            return Err(FolioError::InvalidState(format!(
                "message {} is no longer streaming",
                id.0
            )));
        }
        Ok(message)
    }
}
