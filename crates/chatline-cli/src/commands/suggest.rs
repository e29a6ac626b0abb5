//! /suggest command - list or pick a suggestion card

use super::CommandResult;
use chatline_session::SuggestionCard;

pub struct SuggestCommand;

impl SuggestCommand {
    /// Execute /suggest command
    /// - No args: list the cards
    /// - With n (1-based, as listed): send that card's question
    pub fn execute(args: &str, cards: &[SuggestionCard]) -> CommandResult {
        if cards.is_empty() {
            return CommandResult::Message(
                "Suggestions are only offered before the first message.".to_string(),
            );
        }

        if args.is_empty() {
            return CommandResult::Message(Self::list_text(cards));
        }

        match args.parse::<usize>() {
            Ok(n) if (1..=cards.len()).contains(&n) => {
                CommandResult::Send(cards[n - 1].question.clone())
            }
            _ => CommandResult::Message(format!(
                "Invalid suggestion '{}'. Pick 1-{}.",
                args,
                cards.len()
            )),
        }
    }

    pub fn list_text(cards: &[SuggestionCard]) -> String {
        let mut out = String::from("Try one of these (/suggest <n>):");
        for (i, card) in cards.iter().enumerate() {
            out.push_str(&format!("\n  {}. {}: {}", i + 1, card.title, card.question));
        }
        out
    }
}
