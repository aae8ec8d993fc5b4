//! Convenience re-exports for common use.

pub use crate::config::FolioConfig;
pub use crate::conversation::{Conversation, Message, MessageId, MessageStatus};
pub use crate::error::{FolioError, Result};
pub use crate::markdown::Document;
pub use crate::profile::Profile;
pub use crate::provider::ChatProvider;
pub use crate::session::{Session, SessionClient, TurnRequest};
pub use crate::types::{GenerationSettings, ReasoningEffort, Role};
pub use crate::widget::{ChatWidget, SubmitRejection, WidgetState};
