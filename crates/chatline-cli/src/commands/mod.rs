//! Slash commands for interactive mode

mod edit;
mod feedback;
mod files;
mod history;
mod suggest;

pub use edit::EditCommand;
pub use feedback::FeedbackCommand;
pub use files::FilesCommand;
pub use history::HistoryCommand;
pub use suggest::SuggestCommand;

use chatline_session::{ChatSession, Feedback};
use std::path::PathBuf;

/// Result of executing a slash command
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    /// Reset the conversation to the greeting
    Clear,
    /// Replace a user turn and resend from there
    Edit { index: usize, text: String },
    /// Ask for replacement text for a user turn, then edit
    EditPrompt { index: usize, current: String },
    /// Load files for the next message
    Attach(Vec<PathBuf>),
    /// Drop a staged attachment
    Detach(usize),
    /// Switch light/dark
    ToggleTheme,
    /// Toggle feedback on a bot turn
    Feedback { index: usize, feedback: Feedback },
    /// Send text as if the user had typed it
    Send(String),
    /// Show a message to the user (not sent to the endpoint)
    Message(String),
    /// Exit the application
    Exit,
    /// Unknown command
    Unknown(String),
}

/// Parse an index argument, checking it against the number of turns
pub(crate) fn parse_index(arg: &str, len: usize) -> Result<usize, String> {
    let index = arg
        .parse::<usize>()
        .map_err(|_| format!("Invalid index '{}'. Use a number (0-{}).", arg, len.saturating_sub(1)))?;
    if index >= len {
        return Err(format!(
            "Invalid index {}. Valid range: 0-{}",
            index,
            len.saturating_sub(1)
        ));
    }
    Ok(index)
}

/// Parse and execute a slash command
pub fn execute_command(input: &str, session: &ChatSession) -> Option<CommandResult> {
    let input = input.trim();

    let rest = input.strip_prefix('/')?;
    let parts: Vec<&str> = rest.splitn(2, ' ').collect();
    let command = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    Some(match command.as_str() {
        "help" | "h" | "?" => CommandResult::Message(help_message()),

        "clear" | "c" => CommandResult::Clear,

        "quit" | "exit" | "q" => CommandResult::Exit,

        "edit" | "e" => EditCommand::execute(args, &session.turns()),

        "attach" | "a" => FilesCommand::attach(args),

        "files" | "f" => FilesCommand::list(&session.attachments()),

        "detach" | "d" => FilesCommand::detach(args, session.attachments().len()),

        "theme" => CommandResult::ToggleTheme,

        "good" | "+" => FeedbackCommand::execute(args, Feedback::Positive, &session.turns()),

        "bad" | "-" => FeedbackCommand::execute(args, Feedback::Negative, &session.turns()),

        "context" | "ctx" => HistoryCommand::context(args, session),

        "history" | "ls" => HistoryCommand::list(&session.turns(), &session.feedback()),

        "suggest" | "s" => SuggestCommand::execute(args, &session.suggestions()),

        _ => CommandResult::Unknown(command),
    })
}

fn help_message() -> String {
    r#"Available commands:
  /help, /h, /?            Show this help message
  /history, /ls            List the turns of this conversation
  /edit, /e <i> [text]     Replace your message at index i and resend
  /attach, /a <path>...    Attach files to the next message
  /files, /f               List attached files
  /detach, /d <i>          Remove an attached file
  /good, /+ [i]            Mark a reply as helpful (again to clear)
  /bad, /- [i]             Mark a reply as unhelpful (again to clear)
  /context, /ctx [i]       Show the context sent with a reply
  /suggest, /s [n]         List suggestions, or send suggestion n
  /theme                   Switch between light and dark
  /clear, /c               Start a fresh conversation
  /quit, /exit, /q         Exit chatline

Examples:
  /edit 1 How do I write a test?
  /attach src/main.rs Cargo.toml
  /suggest 2"#
        .to_string()
}
