//! /history and /context commands

use super::{CommandResult, parse_index};
use crate::utils::{format_context, preview};
use chatline_session::{ChatSession, Error, Feedback, FeedbackLog};
use chatline_stream::Turn;

pub struct HistoryCommand;

impl HistoryCommand {
    pub fn list(turns: &[Turn], feedback: &FeedbackLog) -> CommandResult {
        let mut out = String::from("Turns in conversation:");
        for (i, turn) in turns.iter().enumerate() {
            let mark = match feedback.get(i) {
                Some(Feedback::Positive) => " [+]",
                Some(Feedback::Negative) => " [-]",
                None => "",
            };
            let ctx = if turn.context.is_some() { " [ctx]" } else { "" };
            out.push_str(&format!(
                "\n  {}: [{}]{}{} {}",
                i,
                turn.sender.as_str(),
                mark,
                ctx,
                preview(&turn.text, 60)
            ));
        }
        CommandResult::Message(out)
    }

    pub fn context(args: &str, session: &ChatSession) -> CommandResult {
        let index = if args.is_empty() {
            match session.turns().iter().rposition(|t| t.context.is_some()) {
                Some(index) => index,
                None => return CommandResult::Message("No reply carries context.".to_string()),
            }
        } else {
            match parse_index(args, session.turns().len()) {
                Ok(index) => index,
                Err(msg) => return CommandResult::Message(msg),
            }
        };

        match session.context(index) {
            Ok(Some(context)) => {
                CommandResult::Message(format!("Context for turn {}:\n{}", index, format_context(&context)))
            }
            Ok(None) => CommandResult::Message(format!("Turn {} has no context.", index)),
            Err(e @ Error::FeatureDisabled(_)) => CommandResult::Message(e.to_string()),
            Err(e) => CommandResult::Message(format!("Cannot show context: {}", e)),
        }
    }
}
