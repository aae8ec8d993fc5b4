//! Shared test helpers and a scripted provider.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;

use folio::error::FolioError;
use folio::profile::Profile;
use folio::provider::{ChatProvider, ChatRequest, DeltaStream};
use folio::session::SessionClient;
use folio::types::{GenerationSettings, TextStreamDelta};
use folio::widget::ChatWidget;

/// Outcome of one scripted turn.
pub enum Reply {
    /// Stream these fragments, then end cleanly.
    Fragments(Vec<String>),
    /// Stream these fragments, then fail with a stream error.
    FailAfter(Vec<String>, String),
    /// Refuse the request before streaming anything.
    Refuse(String),
    /// Stream whatever the test pushes into the paired sender.
    Manual(mpsc::UnboundedReceiver<Result<String, String>>),
}

impl Reply {
    pub fn text(fragments: &[&str]) -> Self {
        Self::Fragments(fragments.iter().map(|s| s.to_string()).collect())
    }

    pub fn fail_after(fragments: &[&str], error: &str) -> Self {
        Self::FailAfter(
            fragments.iter().map(|s| s.to_string()).collect(),
            error.to_string(),
        )
    }

    /// A reply driven by the test. Dropping the sender ends the stream.
    pub fn manual() -> (Self, mpsc::UnboundedSender<Result<String, String>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::Manual(rx), tx)
    }
}

/// A provider that plays back queued replies and records every request.
pub struct ScriptedProvider {
    model_id: String,
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new(model_id: &str) -> Arc<Self> {
        Arc::new(Self {
            model_id: model_id.to_string(),
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn queue(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Text of the newest content of request `n`.
    pub fn sent_text(&self, n: usize) -> String {
        let requests = self.requests();
        requests[n].contents.last().unwrap().text.clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<DeltaStream, FolioError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::text(&["Mock response"]));

        match reply {
            Reply::Fragments(fragments) => Ok(stream::iter(
                fragments.into_iter().map(|f| Ok(TextStreamDelta::text(f))),
            )
            .boxed()),
            Reply::FailAfter(fragments, error) => Ok(stream::iter(
                fragments
                    .into_iter()
                    .map(|f| Ok(TextStreamDelta::text(f)))
                    .chain(std::iter::once(Err(FolioError::Stream(error)))),
            )
            .boxed()),
            Reply::Refuse(message) => Err(FolioError::api(500, message)),
            Reply::Manual(rx) => Ok(stream::unfold(rx, |mut rx| async move {
                let item = rx.recv().await?;
                Some((
                    item.map(TextStreamDelta::text).map_err(FolioError::Stream),
                    rx,
                ))
            })
            .boxed()),
        }
    }
}

pub fn test_profile() -> Profile {
    Profile::from_toml_str(
        r#"
owner = "Divax Shah"
greeting = "Hi! Ask me anything about Divax."
topics = ["Projects", "Skills"]
suggested_questions = ["What projects has Divax built?", "What are his skills?"]
preamble = "You are Divax's assistant."
"#,
    )
    .unwrap()
}

pub fn settings() -> GenerationSettings {
    GenerationSettings::builder().max_output_tokens(500).build()
}

/// A mounted, open widget backed by `provider`.
pub fn open_widget(provider: &Arc<ScriptedProvider>) -> ChatWidget {
    let client = SessionClient::new(provider.clone(), settings());
    let mut widget = ChatWidget::new(client, &test_profile());
    widget.mount();
    widget.open();
    widget
}
