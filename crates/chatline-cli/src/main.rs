//! chatline - terminal client for streaming chat endpoints

mod commands;
mod config;
mod utils;

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chatline_session::{
    ChatSession, ConversationStore, ExchangeOutcome, HttpTransport, JsonFileStore, MemoryStore,
    SessionEvent, Theme,
};
use chatline_stream::{ChatClient, ConversationUpdate, Turn};
use clap::Parser;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::commands::{CommandResult, SuggestCommand};
use crate::config::Config;
use crate::utils::Palette;

/// chatline - chat with a streaming endpoint from the terminal
#[derive(Parser, Debug)]
#[command(name = "chatline")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Chat endpoint URL (overrides the config file)
    #[arg(long)]
    endpoint: Option<String>,

    /// Send one message, print the reply and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Conversation file to load and save
    #[arg(long)]
    store: Option<PathBuf>,

    /// Do not load or save the conversation
    #[arg(long)]
    no_history: bool,

    /// Start from a fresh conversation
    #[arg(long)]
    clear: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// A message exchange requested from the prompt
enum Exchange {
    Send(String),
    Edit { index: usize, text: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    let default_filter = if args.verbose { "chatline=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    // Initialize config and exit
    if args.init_config {
        match Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = Config::load();

    // CLI takes precedence over the config file
    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| cfg.chat.api_endpoint.clone());
    let client = ChatClient::with_timeout(&endpoint, cfg.request_timeout())?;
    let transport = Arc::new(HttpTransport::new(client));

    let keep_history = cfg.features.chat_history && !args.no_history;
    let store: Arc<dyn ConversationStore> = if keep_history {
        let path = args.store.clone().unwrap_or_else(JsonFileStore::default_path);
        tracing::debug!("Conversation file: {}", path.display());
        Arc::new(JsonFileStore::new(path))
    } else {
        Arc::new(MemoryStore::new())
    };

    let session = ChatSession::new(cfg.session_config(), transport.clone(), store);
    if args.clear {
        session.clear()?;
    }

    // Non-interactive mode
    if let Some(command) = args.command {
        return run_command(&session, &cfg, &command).await;
    }

    run_interactive(&session, &cfg, transport.endpoint(), keep_history).await
}

fn palette(theme: Theme) -> Palette {
    if io::stdout().is_terminal() {
        Palette::for_theme(theme)
    } else {
        Palette::plain()
    }
}

async fn run_command(session: &ChatSession, cfg: &Config, command: &str) -> anyhow::Result<()> {
    println!("> {}", command);
    println!();

    let outcome = exchange(session, cfg, Exchange::Send(command.to_string())).await?;
    if !outcome.is_completed() {
        // The error was already printed by the event handler
        std::process::exit(1);
    }
    Ok(())
}

async fn run_interactive(
    session: &ChatSession,
    cfg: &Config,
    endpoint: &str,
    keep_history: bool,
) -> anyhow::Result<()> {
    // Show startup info (only if TTY)
    if io::stderr().is_terminal() {
        eprintln!("{} ({})", cfg.ui.company_name, endpoint);
    }
    print_banner(session, cfg, keep_history);

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let pending = if input.starts_with('/') {
            let Some(result) = commands::execute_command(input, session) else {
                continue;
            };
            match result {
                CommandResult::Exit => break,
                CommandResult::Send(text) => {
                    let p = palette(session.theme());
                    println!("{}you>{} {}", p.user, p.reset(), text);
                    Some(Exchange::Send(text))
                }
                CommandResult::Edit { index, text } => Some(Exchange::Edit { index, text }),
                CommandResult::EditPrompt { index, current } => {
                    println!("Current: {}", current);
                    print!("{} ", cfg.chat.assistant.edit_placeholder_text);
                    io::stdout().flush()?;
                    let mut text = String::new();
                    io::stdin().read_line(&mut text)?;
                    let text = text.trim().to_string();
                    if text.is_empty() {
                        println!("Edit cancelled.");
                        None
                    } else {
                        Some(Exchange::Edit { index, text })
                    }
                }
                other => {
                    apply_command(session, other).await;
                    None
                }
            }
        } else {
            Some(Exchange::Send(input.to_string()))
        };

        if let Some(pending) = pending {
            match exchange(session, cfg, pending).await {
                Ok(_) => {}
                Err(e) if e.is_rejection() => println!("{}", e),
                Err(e) => eprintln!("Error: {}", e),
            }
        }
        println!();
    }

    Ok(())
}

fn print_banner(session: &ChatSession, cfg: &Config, keep_history: bool) {
    let p = palette(session.theme());
    if let Some(signature) = &cfg.ui.author_signature {
        println!("{}{}{}", p.dim, signature, p.reset());
    }
    if !keep_history {
        println!("{}{}{}", p.dim, cfg.chat.assistant.warning_message, p.reset());
    }

    for (i, turn) in session.turns().iter().enumerate() {
        print_turn(&p, cfg, i, turn);
    }

    let cards = session.suggestions();
    if !cards.is_empty() {
        println!("\n{}", SuggestCommand::list_text(&cards));
    }
    println!(
        "{}{} (/help for commands){}",
        p.dim,
        cfg.chat.assistant.placeholder_text,
        p.reset()
    );
}

fn print_turn(p: &Palette, cfg: &Config, index: usize, turn: &Turn) {
    if turn.is_user() {
        println!("{}[{}] you>{} {}", p.user, index, p.reset(), turn.text);
    } else {
        println!(
            "{}[{}] {}>{} {}",
            p.bot,
            index,
            cfg.chat.assistant.name,
            p.reset(),
            turn.text
        );
    }
}

/// Carry out a command that does not start an exchange
async fn apply_command(session: &ChatSession, result: CommandResult) {
    match result {
        CommandResult::Clear => match session.clear() {
            Ok(()) => println!("Cleared conversation."),
            Err(e) => println!("{}", e),
        },
        CommandResult::Attach(paths) => match session.attach_paths(paths).await {
            Ok(report) => {
                for name in &report.added {
                    println!("Attached {}", name);
                }
                for skipped in &report.skipped {
                    println!("Skipped {}", skipped);
                }
            }
            Err(e) => println!("{}", e),
        },
        CommandResult::Detach(index) => match session.detach(index) {
            Some(attachment) => println!("Removed {}", attachment.name),
            None => println!("No attachment at {}", index),
        },
        CommandResult::ToggleTheme => match session.toggle_theme() {
            Ok(theme) => println!("Theme: {}", theme),
            Err(e) => println!("{}", e),
        },
        CommandResult::Feedback { index, feedback } => {
            match session.record_feedback(index, feedback) {
                Ok(Some(feedback)) => println!("Recorded {:?} feedback on turn {}", feedback, index),
                Ok(None) => println!("Cleared feedback on turn {}", index),
                Err(e) => println!("{}", e),
            }
        }
        CommandResult::Message(msg) => println!("{}", msg),
        CommandResult::Unknown(cmd) => {
            println!("Unknown command: /{}", cmd);
            println!("Type /help for available commands.");
        }
        CommandResult::Exit
        | CommandResult::Send(_)
        | CommandResult::Edit { .. }
        | CommandResult::EditPrompt { .. } => {}
    }
}

/// Run one exchange, printing the reply as it streams
async fn exchange(
    session: &ChatSession,
    cfg: &Config,
    request: Exchange,
) -> chatline_session::Result<ExchangeOutcome> {
    let p = palette(session.theme());
    let label = format!("{}{}>{} ", p.bot, cfg.chat.assistant.name, p.reset());
    let printer = spawn_printer(session.subscribe(), label.clone());

    let result = match request {
        Exchange::Send(text) => session.send(&text).await,
        Exchange::Edit { index, text } => session.edit(index, &text).await,
    };

    match &result {
        Ok(outcome) => {
            // The terminal event was sent before the exchange returned
            let _ = printer.await;
            if let ExchangeOutcome::Failed { index, .. } = outcome {
                if let Some(turn) = session.turn(*index) {
                    println!("{}{}", label, turn.text);
                }
            }
        }
        Err(_) => printer.abort(),
    }
    result
}

/// Print reply text as it arrives, until the exchange ends
fn spawn_printer(mut receiver: broadcast::Receiver<SessionEvent>, label: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        // Use chars().count() for proper Unicode handling
        let mut printed = 0;
        loop {
            match receiver.recv().await {
                Ok(SessionEvent::Update {
                    update: ConversationUpdate::Text { text, .. },
                }) => {
                    if printed == 0 {
                        print!("{}", label);
                    }
                    let new_text: String = text.chars().skip(printed).collect();
                    printed += new_text.chars().count();
                    print!("{}", new_text);
                    io::stdout().flush().ok();
                }
                Ok(SessionEvent::ExchangeEnd { .. }) => {
                    if printed == 0 {
                        print!("{}", label);
                    }
                    println!();
                    break;
                }
                Ok(SessionEvent::Error { message, .. }) => {
                    if printed > 0 {
                        println!();
                    }
                    eprintln!("Error: {}", message);
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    tracing::debug!("Printer skipped {} events", missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
