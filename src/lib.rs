//! Folio: a portfolio chat assistant.
//!
//! A visitor asks questions about the site owner; answers stream back from
//! Gemini and are rendered from markdown into safe HTML (or plain text for
//! terminals). The pieces:
//!
//! - [`widget::ChatWidget`]: visibility, input, submission gating, streaming
//! - [`conversation::Conversation`]: the ordered transcript
//! - [`session::SessionClient`]: one stateful conversation with the service
//! - [`markdown`]: markdown to HTML with raw HTML neutralised
//!
//! # Quick Start
//!
//! ```no_run
//! use folio::prelude::*;
//!
//! # async fn example() -> folio::error::Result<()> {
//! let config = FolioConfig::load(None)?;
//! let profile = Profile::builtin()?;
//! let mut widget = ChatWidget::new(SessionClient::from_config(&config), &profile);
//! widget.mount();
//! widget.open();
//! widget.set_input("What projects has Divax built?");
//! if widget.submit().is_ok() {
//!     widget.settle().await;
//! }
//! for (message, doc) in widget.transcript() {
//!     println!("{}: {}", message.role, doc.to_plain_text());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod conversation;
pub mod error;
pub mod markdown;
pub mod prelude;
pub mod profile;
pub mod provider;
pub mod session;
pub mod types;
pub mod widget;

#[cfg(feature = "cli")]
pub mod cli;
