//! Command-line front end for folio.

pub mod errors;
pub mod terminal;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::types::ReasoningEffort;

/// Folio portfolio chat
#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Chat with a portfolio's AI assistant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the chat widget in the terminal
    Chat(ChatArgs),
    /// Render markdown to sanitised HTML
    Render(RenderArgs),
    /// Print the first-turn preamble
    Preamble(PreambleArgs),
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Gemini model id (overrides config and FOLIO_MODEL)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Output token ceiling per reply
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Reasoning effort (minimal, low, medium, high)
    #[arg(long)]
    pub reasoning: Option<ReasoningEffort>,

    /// Settings file (defaults to the platform config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Profile file replacing the built-in one
    #[arg(short, long)]
    pub profile: Option<PathBuf>,
}

/// Arguments for the `render` subcommand.
#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Markdown file; reads stdin when omitted
    pub file: Option<PathBuf>,

    /// Emit terminal text instead of HTML
    #[arg(long)]
    pub plain: bool,
}

/// Arguments for the `preamble` subcommand.
#[derive(Parser, Debug)]
pub struct PreambleArgs {
    /// Profile file replacing the built-in one
    #[arg(short, long)]
    pub profile: Option<PathBuf>,
}

/// One line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Open,
    Close,
    Toggle,
    /// Copy suggestion `n` (1-based) into the input.
    Suggest(usize),
    /// Submit whatever is in the input.
    Send,
    Transcript,
    Reset,
    Help,
    Quit,
    /// Anything that is not a command is a question.
    Ask(String),
    Unknown(String),
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(command) = trimmed.strip_prefix('/') else {
            return Self::Ask(trimmed.to_string());
        };
        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();
        match (name, arg) {
            ("open", None) => Self::Open,
            ("close", None) => Self::Close,
            ("toggle", None) => Self::Toggle,
            ("suggest", Some(n)) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Self::Suggest(n),
                _ => Self::Unknown(trimmed.to_string()),
            },
            ("send", None) => Self::Send,
            ("transcript", None) => Self::Transcript,
            ("reset", None) => Self::Reset,
            ("help", None) => Self::Help,
            ("quit" | "exit", None) => Self::Quit,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }
}

pub const CHAT_HELP: &str = "\
/open  /close  /toggle   show or hide the chat panel
/suggest N               put suggested question N in the input
/send                    send the current input
/transcript              print the whole conversation
/reset                   start a new conversation
/quit                    leave
Anything else is sent as a question.";

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_chat_with_defaults() {
        let cli = Cli::try_parse_from(["folio", "chat"]).unwrap();
        match cli.command {
            Commands::Chat(args) => {
                assert!(args.model.is_none());
                assert!(args.max_tokens.is_none());
                assert!(args.reasoning.is_none());
                assert!(args.config.is_none());
                assert!(args.profile.is_none());
            }
            other => panic!("expected Chat, got {other:?}"),
        }
    }

    #[test]
    fn parse_chat_with_all_options() {
        let cli = Cli::try_parse_from([
            "folio",
            "chat",
            "-m",
            "gemini-2.5-flash",
            "--max-tokens",
            "800",
            "--reasoning",
            "low",
            "-c",
            "folio.toml",
            "-p",
            "me.toml",
        ])
        .unwrap();
        match cli.command {
            Commands::Chat(args) => {
                assert_eq!(args.model.as_deref(), Some("gemini-2.5-flash"));
                assert_eq!(args.max_tokens, Some(800));
                assert_eq!(args.reasoning, Some(ReasoningEffort::Low));
                assert_eq!(args.config, Some(PathBuf::from("folio.toml")));
                assert_eq!(args.profile, Some(PathBuf::from("me.toml")));
            }
            other => panic!("expected Chat, got {other:?}"),
        }
    }

    #[test]
    fn parse_render_plain_from_file() {
        let cli = Cli::try_parse_from(["folio", "render", "reply.md", "--plain"]).unwrap();
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.file, Some(PathBuf::from("reply.md")));
                assert!(args.plain);
            }
            other => panic!("expected Render, got {other:?}"),
        }
    }

    #[test]
    fn parse_bad_reasoning_is_error() {
        assert!(Cli::try_parse_from(["folio", "chat", "--reasoning", "max"]).is_err());
    }

    #[test]
    fn parse_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["folio"]).is_err());
    }

    #[test]
    fn chat_lines_parse_to_commands() {
        assert_eq!(ChatCommand::parse("/open"), ChatCommand::Open);
        assert_eq!(ChatCommand::parse("  /toggle "), ChatCommand::Toggle);
        assert_eq!(ChatCommand::parse("/suggest 2"), ChatCommand::Suggest(2));
        assert_eq!(ChatCommand::parse("/exit"), ChatCommand::Quit);
        assert_eq!(
            ChatCommand::parse("What is QuizWiz?"),
            ChatCommand::Ask("What is QuizWiz?".to_string())
        );
        assert_eq!(ChatCommand::parse(""), ChatCommand::Ask(String::new()));
    }

    #[test]
    fn malformed_commands_are_unknown() {
        assert!(matches!(ChatCommand::parse("/suggest"), ChatCommand::Unknown(_)));
        assert!(matches!(ChatCommand::parse("/suggest 0"), ChatCommand::Unknown(_)));
        assert!(matches!(ChatCommand::parse("/open now"), ChatCommand::Unknown(_)));
        assert!(matches!(ChatCommand::parse("/dance"), ChatCommand::Unknown(_)));
    }
}
