//! Terminal drawing for the chat widget.

use std::borrow::Cow;
use std::io::{self, Write};

use crossterm::style::Stylize;

use crate::conversation::{Message, MessageStatus};
use crate::markdown::Document;
use crate::profile::WelcomePanel;
use crate::types::Role;
use crate::widget::WidgetState;

fn is_unsafe(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\t'
}

/// Drop control characters other than newline and tab, so model text cannot
/// drive the terminal.
pub fn sanitize_terminal(text: &str) -> Cow<'_, str> {
    if text.chars().any(is_unsafe) {
        Cow::Owned(text.chars().filter(|c| !is_unsafe(*c)).collect())
    } else {
        Cow::Borrowed(text)
    }
}

pub fn write_welcome(out: &mut impl Write, panel: &WelcomePanel) -> io::Result<()> {
    writeln!(out, "{}", panel.greeting.as_str().bold())?;
    if !panel.topics.is_empty() {
        writeln!(out, "Ask me about:")?;
        for topic in &panel.topics {
            writeln!(out, "  • {topic}")?;
        }
    }
    write_suggestions(out, &panel.suggested_questions)
}

pub fn write_suggestions(out: &mut impl Write, questions: &[String]) -> io::Result<()> {
    if questions.is_empty() {
        return Ok(());
    }
    writeln!(out, "{}", "Try one of these (/suggest N):".dim())?;
    for (i, question) in questions.iter().enumerate() {
        writeln!(out, "  {} {question}", format!("{}.", i + 1).cyan())?;
    }
    Ok(())
}

/// Role label that starts a message.
pub fn write_label(out: &mut impl Write, role: Role) -> io::Result<()> {
    match role {
        Role::Visitor => write!(out, "{} ", "you ›".cyan().bold()),
        Role::Assistant => write!(out, "{} ", "assistant ›".green().bold()),
    }
}

/// A finished or in-progress message, rendered for the terminal.
pub fn write_message(out: &mut impl Write, message: &Message, doc: &Document) -> io::Result<()> {
    write_label(out, message.role)?;
    if message.is_streaming() && doc.is_empty() {
        return writeln!(out, "{}", "…".dim());
    }
    let text = doc.to_plain_text();
    let text = sanitize_terminal(&text);
    match message.status {
        MessageStatus::Failed => writeln!(out, "{}", text.as_ref().red()),
        _ => writeln!(out, "{text}"),
    }
}

pub fn write_prompt(out: &mut impl Write, state: WidgetState) -> io::Result<()> {
    let marker = match state {
        WidgetState::Closed => "[closed]".dim(),
        WidgetState::OpenIdle => "[open]".green(),
        WidgetState::OpenAwaiting => "[waiting]".yellow(),
    };
    write!(out, "{marker} > ")?;
    out.flush()
}
