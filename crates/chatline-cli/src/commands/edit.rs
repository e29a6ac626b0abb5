//! /edit command - replace a user message and resend

use super::{CommandResult, parse_index};
use chatline_stream::Turn;

pub struct EditCommand;

impl EditCommand {
    /// Execute /edit command
    /// - Expects `<index> [new text]`; without text the user is asked for it
    /// - The index must name one of the user's own turns
    pub fn execute(args: &str, turns: &[Turn]) -> CommandResult {
        let mut parts = args.splitn(2, ' ');
        let index_arg = parts.next().unwrap_or("");
        let text = parts.next().map(str::trim).unwrap_or("");

        if index_arg.is_empty() {
            return CommandResult::Message("Usage: /edit <index> [new text]".to_string());
        }

        let index = match parse_index(index_arg, turns.len()) {
            Ok(index) => index,
            Err(msg) => return CommandResult::Message(msg),
        };

        if !turns[index].is_user() {
            return CommandResult::Message(format!(
                "Turn {} is a reply; only your own messages can be edited.",
                index
            ));
        }

        if text.is_empty() {
            return CommandResult::EditPrompt {
                index,
                current: turns[index].text.clone(),
            };
        }

        CommandResult::Edit {
            index,
            text: text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::two_exchanges;

    #[test]
    fn test_edit_user_turn() {
        assert_eq!(
            EditCommand::execute("1   try again", &two_exchanges()),
            CommandResult::Edit {
                index: 1,
                text: "try again".into()
            }
        );
    }

    #[test]
    fn test_edit_rejects_bot_turn() {
        let result = EditCommand::execute("2 nope", &two_exchanges());
        assert!(matches!(result, CommandResult::Message(msg) if msg.contains("only your own")));
    }

    #[test]
    fn test_edit_rejects_out_of_range() {
        let result = EditCommand::execute("9 nope", &two_exchanges());
        assert!(matches!(result, CommandResult::Message(msg) if msg.contains("Valid range: 0-4")));
    }

    #[test]
    fn test_edit_without_text_asks_for_it() {
        assert_eq!(
            EditCommand::execute("3", &two_exchanges()),
            CommandResult::EditPrompt {
                index: 3,
                current: "q2".into()
            }
        );
    }
}
