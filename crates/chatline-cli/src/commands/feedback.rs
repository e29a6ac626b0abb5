//! /good and /bad commands - rate a reply

use super::{CommandResult, parse_index};
use chatline_session::Feedback;
use chatline_stream::Turn;

pub struct FeedbackCommand;

impl FeedbackCommand {
    pub fn execute(args: &str, feedback: Feedback, turns: &[Turn]) -> CommandResult {
        if args.is_empty() {
            // Default to the latest reply
            return match turns.iter().rposition(Turn::is_bot) {
                Some(index) => CommandResult::Feedback { index, feedback },
                None => CommandResult::Message("No reply to rate yet.".to_string()),
            };
        }

        match parse_index(args, turns.len()) {
            Ok(index) if turns[index].is_bot() => CommandResult::Feedback { index, feedback },
            Ok(index) => CommandResult::Message(format!("Turn {} is not a reply.", index)),
            Err(msg) => CommandResult::Message(msg),
        }
    }
}
