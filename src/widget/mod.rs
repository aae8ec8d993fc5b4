//! Widget controller: visibility, input, submission gating and streaming.
//!
//! The controller owns the transcript and the single session. Submitting a
//! question appends the visitor message and an empty assistant placeholder,
//! then spawns a task that streams the reply back as [`TurnEvent`]s over a
//! channel. The view feeds those events to [`ChatWidget::apply`] (or awaits
//! them with [`ChatWidget::next_event`] / [`ChatWidget::settle`]), so the
//! widget keeps answering toggles and keystrokes while a reply streams.
//!
//! Closing the panel neither clears the transcript nor cancels a running
//! turn: fragments keep landing and are there when the panel reopens.

pub mod events;
pub mod state;

pub use events::{TurnEvent, TurnId, WidgetUpdate};
pub use state::{SessionStatus, SubmitRejection, Visibility, WidgetState};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::conversation::{Conversation, Message, MessageId};
use crate::markdown::{self, Block, Document, Inline};
use crate::profile::{Profile, WelcomePanel};
use crate::session::{Session, SessionClient, TurnRequest};
use crate::types::Role;

/// Shown in place of a reply whenever a turn fails.
pub const FALLBACK_REPLY: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Debug, Clone, Copy)]
struct InFlight {
    turn: TurnId,
    message: MessageId,
}

pub struct ChatWidget {
    client: SessionClient,
    session: Option<Session>,
    status: SessionStatus,
    preamble: String,
    welcome: WelcomePanel,
    visibility: Visibility,
    input: String,
    conversation: Conversation,
    in_flight: Option<InFlight>,
    next_turn: u64,
    scroll_target: Option<MessageId>,
    events_tx: UnboundedSender<TurnEvent>,
    events_rx: UnboundedReceiver<TurnEvent>,
}

impl ChatWidget {
    /// Create a closed widget. Call [`ChatWidget::mount`] to open its session.
    pub fn new(client: SessionClient, profile: &Profile) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            client,
            session: None,
            status: SessionStatus::Initializing,
            preamble: profile.preamble.clone(),
            welcome: profile.welcome_panel(),
            visibility: Visibility::Closed,
            input: String::new(),
            conversation: Conversation::new(),
            in_flight: None,
            next_turn: 1,
            scroll_target: None,
            events_tx,
            events_rx,
        }
    }

    /// Open the widget's session. Failure is logged and leaves submission
    /// disabled; the rest of the widget keeps working.
    pub fn mount(&mut self) {
        if self.session.is_some() {
            debug!("chat widget already mounted");
            return;
        }
        match self.client.open() {
            Ok(session) => {
                self.session = Some(session);
                self.status = SessionStatus::Ready;
            }
            Err(e) => {
                error!(error = %e, category = %e.category(), "failed to initialise chat session");
                self.status = SessionStatus::Failed(e.to_string());
            }
        }
    }

    /// Release the session and drop the widget. A turn still streaming stops
    /// at its next fragment.
    pub fn unmount(mut self) {
        if let Some(session) = self.client.close() {
            info!(session = %session.id(), messages = self.conversation.len(), "chat widget unmounted");
        }
    }

    /// Discard the transcript and start over with a fresh session. Events
    /// from a turn started before the reset are ignored.
    pub fn reset(&mut self) {
        self.client.close();
        self.session = None;
        self.status = SessionStatus::Initializing;
        self.conversation.clear();
        self.in_flight = None;
        self.input.clear();
        self.scroll_target = None;
        self.mount();
    }

    pub fn state(&self) -> WidgetState {
        match (self.visibility, self.in_flight.is_some()) {
            (Visibility::Closed, _) => WidgetState::Closed,
            (Visibility::Open, false) => WidgetState::OpenIdle,
            (Visibility::Open, true) => WidgetState::OpenAwaiting,
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn session_status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_awaiting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Flip the floating toggle.
    pub fn toggle(&mut self) -> Visibility {
        match self.visibility {
            Visibility::Closed => self.open(),
            Visibility::Open => self.close(),
        }
        self.visibility
    }

    pub fn open(&mut self) {
        if self.visibility == Visibility::Closed {
            debug!(messages = self.conversation.len(), "chat panel opened");
            self.visibility = Visibility::Open;
            self.mark_scroll();
        }
    }

    /// Hide the panel. The transcript and any running turn are left alone.
    pub fn close(&mut self) {
        if self.visibility == Visibility::Open {
            debug!(awaiting = self.is_awaiting(), "chat panel closed");
            self.visibility = Visibility::Closed;
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn suggestions(&self) -> &[String] {
        &self.welcome.suggested_questions
    }

    /// Copy a suggested question into the input without submitting it.
    pub fn select_suggestion(&mut self, index: usize) -> bool {
        match self.welcome.suggested_questions.get(index) {
            Some(question) => {
                self.input = question.clone();
                true
            }
            None => false,
        }
    }

    /// The welcome panel, shown while the panel is open and the transcript
    /// is empty.
    pub fn welcome(&self) -> Option<&WelcomePanel> {
        (self.visibility == Visibility::Open && self.conversation.is_empty())
            .then_some(&self.welcome)
    }

    pub fn can_submit(&self) -> bool {
        self.check_submission().is_ok()
    }

    fn check_submission(&self) -> Result<&Session, SubmitRejection> {
        if self.visibility == Visibility::Closed {
            return Err(SubmitRejection::Closed);
        }
        if self.input.trim().is_empty() {
            return Err(SubmitRejection::EmptyInput);
        }
        if self.in_flight.is_some() {
            return Err(SubmitRejection::Busy);
        }
        self.session.as_ref().ok_or(SubmitRejection::SessionUnavailable)
    }

    /// Submit the current input.
    ///
    /// On success the visitor message and an empty placeholder are appended,
    /// the input is cleared and the reply starts streaming on the current
    /// tokio runtime. On rejection nothing changes.
    pub fn submit(&mut self) -> Result<TurnId, SubmitRejection> {
        let session = self.check_submission()?.clone();
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("chat submission outside a tokio runtime");
            return Err(SubmitRejection::SessionUnavailable);
        };

        let text = self.input.trim().to_string();
        let request = if session.claim_first_turn() {
            TurnRequest::framed(self.preamble.as_str(), text.as_str())
        } else {
            TurnRequest::plain(text.as_str())
        };

        self.conversation.push_visitor(text);
        let message = self.conversation.push_placeholder();
        self.input.clear();

        let turn = TurnId(self.next_turn);
        self.next_turn += 1;
        self.in_flight = Some(InFlight { turn, message });
        self.mark_scroll();

        debug!(%turn, framed = request.is_framed(), "chat turn submitted");
        runtime.spawn(events::drive_turn(
            session,
            request,
            turn,
            self.events_tx.clone(),
        ));
        Ok(turn)
    }

    /// Apply one turn event to the transcript.
    pub fn apply(&mut self, event: TurnEvent) -> Option<WidgetUpdate> {
        let Some(in_flight) = self.in_flight.filter(|f| f.turn == event.turn()) else {
            debug!(turn = %event.turn(), "ignoring event for a turn that is no longer current");
            return None;
        };
        let message = in_flight.message;

        let update = match event {
            TurnEvent::Fragment { text, .. } => {
                if let Err(e) = self.conversation.append_fragment(message, &text) {
                    warn!(error = %e, "dropping fragment");
                    return None;
                }
                WidgetUpdate::Appended {
                    message,
                    fragment: text,
                }
            }
            TurnEvent::Finished { turn } => {
                self.in_flight = None;
                let has_text = self
                    .conversation
                    .get(message)
                    .is_some_and(|m| !m.text.is_empty());
                if has_text {
                    self.finish_message(message, None);
                    WidgetUpdate::Completed { message }
                } else {
                    warn!(%turn, "reply stream ended without any text");
                    self.finish_message(message, Some(FALLBACK_REPLY));
                    WidgetUpdate::Failed { message }
                }
            }
            TurnEvent::Failed { turn, error } => {
                warn!(%turn, error = %error, category = %error.category(), "chat turn failed");
                self.in_flight = None;
                self.finish_message(message, Some(FALLBACK_REPLY));
                WidgetUpdate::Failed { message }
            }
        };
        self.mark_scroll();
        Some(update)
    }

    fn finish_message(&mut self, message: MessageId, replacement: Option<&str>) {
        let result = match replacement {
            Some(text) => self.conversation.fail(message, text),
            None => self.conversation.finalize(message),
        };
        if let Err(e) = result {
            warn!(error = %e, "could not close reply");
        }
    }

    /// Wait for the next turn event. Pends while no turn is running.
    pub async fn next_event(&mut self) -> Option<TurnEvent> {
        self.events_rx.recv().await
    }

    /// Apply events until no turn is in flight.
    pub async fn settle(&mut self) {
        while self.in_flight.is_some() {
            match self.events_rx.recv().await {
                Some(event) => {
                    self.apply(event);
                }
                None => break,
            }
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Every message paired with its rendering.
    pub fn transcript(&self) -> impl Iterator<Item = (&Message, Document)> + '_ {
        self.conversation
            .messages()
            .iter()
            .map(|message| (message, render_message(message)))
    }

    /// Message the view should scroll to, if it changed since the last call.
    pub fn take_scroll_target(&mut self) -> Option<MessageId> {
        self.scroll_target.take()
    }

    fn mark_scroll(&mut self) {
        if let Some(last) = self.conversation.last() {
            self.scroll_target = Some(last.id);
        }
    }
}

/// Visitor text is shown verbatim; assistant text goes through markdown.
pub fn render_message(message: &Message) -> Document {
    match message.role {
        Role::Assistant => markdown::parse(&message.text),
        Role::Visitor if message.text.is_empty() => Document::default(),
        Role::Visitor => Document {
            blocks: vec![Block::Paragraph {
                inlines: vec![Inline::text(message.text.clone())],
            }],
        },
    }
}
