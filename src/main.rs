//! Folio CLI binary entry point.

use std::io::{self, Read, Write};
use std::path::Path;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use folio::cli::errors::format_error_help;
use folio::cli::terminal::{
    sanitize_terminal, write_label, write_message, write_prompt, write_suggestions, write_welcome,
};
use folio::cli::{ChatArgs, ChatCommand, Cli, Commands, PreambleArgs, RenderArgs, CHAT_HELP};
use folio::config::FolioConfig;
use folio::conversation::MessageId;
use folio::error::Result;
use folio::markdown;
use folio::profile::Profile;
use folio::session::SessionClient;
use folio::types::Role;
use folio::widget::{
    ChatWidget, SessionStatus, SubmitRejection, TurnEvent, Visibility, WidgetUpdate, FALLBACK_REPLY,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Chat(args) => handle_chat(args).await,
        Commands::Render(args) => handle_render(args),
        Commands::Preamble(args) => handle_preamble(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", format_error_help(&e));
        std::process::exit(1);
    }
}

fn load_profile(path: Option<&Path>) -> Result<Profile> {
    match path {
        Some(path) => Profile::load(path),
        None => Profile::builtin(),
    }
}

fn handle_render(args: RenderArgs) -> Result<()> {
    let source = match &args.file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let doc = markdown::parse(&source);
    if args.plain {
        println!("{}", doc.to_plain_text());
    } else {
        print!("{}", doc.to_html());
    }
    Ok(())
}

fn handle_preamble(args: PreambleArgs) -> Result<()> {
    let profile = load_profile(args.profile.as_deref())?;
    println!("{}", profile.preamble);
    Ok(())
}

async fn handle_chat(args: ChatArgs) -> Result<()> {
    let mut config = FolioConfig::load(args.config.as_deref())?;
    if let Some(model) = args.model {
        config.settings_mut().model = model;
    }
    if let Some(max) = args.max_tokens {
        config.settings_mut().max_output_tokens = max;
    }
    if args.reasoning.is_some() {
        config.settings_mut().reasoning_effort = args.reasoning;
    }
    let profile_path = args.profile.or_else(|| config.settings().profile.clone());
    let profile = load_profile(profile_path.as_deref())?;

    let mut widget = ChatWidget::new(SessionClient::from_config(&config), &profile);
    widget.mount();
    if let SessionStatus::Failed(reason) = widget.session_status() {
        eprintln!("Chat is unavailable: {reason}");
    }

    let (line_tx, mut lines) = mpsc::unbounded_channel::<String>();
    tokio::spawn(async move {
        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = stdin.next_line().await {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut view = ChatView::default();
    let mut out = io::stdout();
    println!("{} chat. /open to start, /help for commands.", profile.owner);
    write_prompt(&mut out, widget.state())?;

    let mut stdin_open = true;
    loop {
        let input = tokio::select! {
            line = lines.recv(), if stdin_open => Input::Line(line),
            Some(event) = widget.next_event() => Input::Event(event),
        };

        match input {
            Input::Line(None) => {
                stdin_open = false;
                if !widget.is_awaiting() {
                    break;
                }
            }
            Input::Line(Some(line)) => {
                if !view.handle_line(&mut widget, &line, &mut out)? {
                    break;
                }
                write_prompt(&mut out, widget.state())?;
            }
            Input::Event(event) => {
                let finished = view.handle_event(&mut widget, event, &mut out)?;
                if finished {
                    if !stdin_open {
                        break;
                    }
                    write_prompt(&mut out, widget.state())?;
                }
            }
        }
    }

    writeln!(out)?;
    widget.unmount();
    Ok(())
}

enum Input {
    Line(Option<String>),
    Event(TurnEvent),
}

/// Terminal view state: which reply is currently printing live.
#[derive(Default)]
struct ChatView {
    live: Option<MessageId>,
}

impl ChatView {
    /// Returns `false` when the visitor asked to quit.
    fn handle_line(
        &mut self,
        widget: &mut ChatWidget,
        line: &str,
        out: &mut impl Write,
    ) -> Result<bool> {
        match ChatCommand::parse(line) {
            ChatCommand::Open => {
                widget.open();
                self.show_panel(widget, out)?;
            }
            ChatCommand::Close => {
                widget.close();
                self.live = None;
                writeln!(out, "(chat hidden)")?;
            }
            ChatCommand::Toggle => match widget.toggle() {
                Visibility::Open => self.show_panel(widget, out)?,
                Visibility::Closed => {
                    self.live = None;
                    writeln!(out, "(chat hidden)")?;
                }
            },
            ChatCommand::Suggest(n) => {
                if widget.select_suggestion(n - 1) {
                    writeln!(out, "input: {}  (/send to ask)", widget.input())?;
                } else {
                    write_suggestions(out, widget.suggestions())?;
                }
            }
            ChatCommand::Send => self.submit(widget, out)?,
            ChatCommand::Ask(text) => {
                widget.set_input(text);
                self.submit(widget, out)?;
            }
            ChatCommand::Transcript => {
                for (message, doc) in widget.transcript() {
                    write_message(out, message, &doc)?;
                }
            }
            ChatCommand::Reset => {
                widget.reset();
                self.live = None;
                if widget.visibility() == Visibility::Open {
                    self.show_panel(widget, out)?;
                }
            }
            ChatCommand::Help => writeln!(out, "{CHAT_HELP}")?,
            ChatCommand::Quit => return Ok(false),
            ChatCommand::Unknown(command) => {
                writeln!(out, "unknown command {command}; try /help")?;
            }
        }
        Ok(true)
    }

    fn submit(&mut self, widget: &mut ChatWidget, out: &mut impl Write) -> Result<()> {
        match widget.submit() {
            Ok(_) => {}
            Err(SubmitRejection::Closed) => writeln!(out, "The chat is closed; /open it first.")?,
            Err(SubmitRejection::EmptyInput) => {}
            Err(rejection) => writeln!(out, "Not sent: {rejection}")?,
        }
        Ok(())
    }

    /// Redraw the open panel: welcome copy, or the transcript so far.
    fn show_panel(&mut self, widget: &mut ChatWidget, out: &mut impl Write) -> Result<()> {
        if let Some(panel) = widget.welcome() {
            write_welcome(out, panel)?;
            return Ok(());
        }
        self.live = None;
        for (message, doc) in widget.transcript() {
            if message.is_streaming() {
                write_label(out, message.role)?;
                write!(out, "{}", sanitize_terminal(&message.text))?;
                out.flush()?;
                self.live = Some(message.id);
            } else {
                write_message(out, message, &doc)?;
            }
        }
        Ok(())
    }

    /// Apply a turn event and draw it if the panel is open. Returns `true`
    /// once the turn is over.
    fn handle_event(
        &mut self,
        widget: &mut ChatWidget,
        event: TurnEvent,
        out: &mut impl Write,
    ) -> Result<bool> {
        let Some(update) = widget.apply(event) else {
            return Ok(false);
        };
        let visible = widget.visibility() == Visibility::Open;
        match update {
            WidgetUpdate::Appended { message, fragment } => {
                if visible {
                    if self.live != Some(message) {
                        write_label(out, Role::Assistant)?;
                        self.live = Some(message);
                    }
                    write!(out, "{}", sanitize_terminal(&fragment))?;
                    out.flush()?;
                }
                Ok(false)
            }
            WidgetUpdate::Completed { .. } => {
                if visible && self.live.take().is_some() {
                    writeln!(out)?;
                }
                Ok(true)
            }
            WidgetUpdate::Failed { .. } => {
                if visible {
                    if self.live.take().is_some() {
                        writeln!(out)?;
                    } else {
                        write_label(out, Role::Assistant)?;
                    }
                    writeln!(out, "{FALLBACK_REPLY}")?;
                }
                Ok(true)
            }
        }
    }
}
