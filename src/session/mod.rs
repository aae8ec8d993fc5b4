//! Session client: one logical conversation with the generative-text
//! service per widget instance.
//!
//! [`SessionClient`] owns at most one [`Session`]. A session replays its
//! history of completed exchanges on every turn and streams the reply back
//! as text fragments.

pub mod request;

pub use request::{TurnRequest, FRAME_SEPARATOR};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::FolioConfig;
use crate::error::{FolioError, Result};
use crate::provider::{self, ChatProvider, ChatRequest};
use crate::types::{ChatContent, FinishReason, GenerationSettings};

/// Lazy sequence of reply fragments for one turn. Finite, not restartable.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Creates and releases the widget's single session.
pub struct SessionClient {
    provider: Arc<dyn ChatProvider>,
    settings: GenerationSettings,
    session: Option<Session>,
}

impl SessionClient {
    pub fn new(provider: Arc<dyn ChatProvider>, settings: GenerationSettings) -> Self {
        Self {
            provider,
            settings,
            session: None,
        }
    }

    /// Client backed by the provider and settings in `config`.
    pub fn from_config(config: &FolioConfig) -> Self {
        Self::new(provider::create_provider(config), config.generation_settings())
    }

    /// Open the session. Rejected while one is already open.
    pub fn open(&mut self) -> Result<Session> {
        if self.session.is_some() {
            return Err(FolioError::InvalidState(
                "a session is already open for this widget".to_string(),
            ));
        }
        if self.provider.model_id().trim().is_empty() {
            return Err(FolioError::Configuration("model id is empty".to_string()));
        }
        if self.settings.max_output_tokens == Some(0) {
            return Err(FolioError::Configuration(
                "max output tokens must be positive".to_string(),
            ));
        }

        let session = Session {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                started_at: Utc::now(),
                provider: Arc::clone(&self.provider),
                settings: self.settings.clone(),
                history: Mutex::new(Vec::new()),
                first_turn_claimed: AtomicBool::new(false),
                turns_sent: AtomicU64::new(0),
            }),
        };
        info!(
            session = %session.id(),
            provider = self.provider.provider_name(),
            model = self.provider.model_id(),
            "chat session opened"
        );
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Release the session so a fresh one can be opened.
    pub fn close(&mut self) -> Option<Session> {
        let session = self.session.take();
        if let Some(ref session) = session {
            debug!(session = %session.id(), "chat session closed");
        }
        session
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn provider(&self) -> &Arc<dyn ChatProvider> {
        &self.provider
    }
}

/// Handle to one ongoing exchange. Cheap to clone; clones share history.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: Uuid,
    started_at: DateTime<Utc>,
    provider: Arc<dyn ChatProvider>,
    settings: GenerationSettings,
    history: Mutex<Vec<ChatContent>>,
    first_turn_claimed: AtomicBool,
    turns_sent: AtomicU64,
}

impl SessionInner {
    fn record_exchange(&self, visitor: ChatContent, reply: ChatContent) {
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        history.push(visitor);
        history.push(reply);
    }

    /// Hand the first-turn claim back after a framed turn that produced no
    /// reply, so the next turn carries the preamble.
    fn release_first_turn(&self, turn: u64) {
        debug!(session = %self.id, turn, "framed turn failed; first-turn claim released");
        self.first_turn_claimed.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("model", &self.inner.provider.model_id())
            .field("turns_sent", &self.turns_sent())
            .finish()
    }
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.inner.settings
    }

    /// Returns true to the caller that gets to send the framed first turn.
    /// Once claimed it stays claimed unless that framed turn fails.
    pub fn claim_first_turn(&self) -> bool {
        !self.inner.first_turn_claimed.swap(true, Ordering::SeqCst)
    }

    /// Number of turns handed to the provider so far.
    pub fn turns_sent(&self) -> u64 {
        self.inner.turns_sent.load(Ordering::SeqCst)
    }

    /// Completed exchanges, oldest first.
    pub fn history(&self) -> Vec<ChatContent> {
        self.inner
            .history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Send one turn and stream the reply.
    ///
    /// Fragments arrive in the order the service emits them. The exchange is
    /// added to the history only if the stream ends cleanly with some text.
    /// A framed turn that does not get that far returns the first-turn claim.
    pub async fn send(&self, request: TurnRequest) -> Result<FragmentStream> {
        let framed = request.is_framed();
        let visitor = ChatContent::visitor(request.outgoing_text());
        let mut contents = self.history();
        contents.push(visitor.clone());

        let turn = self.inner.turns_sent.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            session = %self.id(),
            turn,
            framed,
            "sending turn"
        );

        let chat_request = ChatRequest {
            contents,
            settings: self.inner.settings.clone(),
        };
        let mut deltas = match self.inner.provider.stream_chat(&chat_request).await {
            Ok(deltas) => deltas,
            Err(e) => {
                if framed {
                    self.inner.release_first_turn(turn);
                }
                return Err(e);
            }
        };

        let inner = Arc::clone(&self.inner);
        let stream = async_stream::stream! {
            let mut reply = String::new();
            let mut failed = false;

            while let Some(delta) = deltas.next().await {
                match delta {
                    Ok(delta) => {
                        if delta.finish_reason == Some(FinishReason::Length) {
                            info!(session = %inner.id, turn, "reply hit the output cap");
                        }
                        if let Some(usage) = delta.usage {
                            debug!(
                                session = %inner.id,
                                turn,
                                input_tokens = usage.input_tokens,
                                output_tokens = usage.output_tokens,
                                "turn usage"
                            );
                        }
                        if delta.text.is_empty() {
                            continue;
                        }
                        reply.push_str(&delta.text);
                        yield Ok(delta.text);
                    }
                    Err(e) => {
                        failed = true;
                        // Consumers stop polling after an error.
                        if framed {
                            inner.release_first_turn(turn);
                        }
                        yield Err(e);
                        break;
                    }
                }
            }

            if !failed && !reply.is_empty() {
                inner.record_exchange(visitor, ChatContent::assistant(reply));
            } else if !failed && framed {
                inner.release_first_turn(turn);
            }
        };

        Ok(Box::pin(stream))
    }
}
