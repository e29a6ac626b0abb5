//! /attach, /files and /detach commands

use super::{CommandResult, parse_index};
use std::path::PathBuf;

pub struct FilesCommand;

impl FilesCommand {
    /// Paths are separated by whitespace
    pub fn attach(args: &str) -> CommandResult {
        let paths: Vec<PathBuf> = args.split_whitespace().map(PathBuf::from).collect();
        if paths.is_empty() {
            return CommandResult::Message("Usage: /attach <path>...".to_string());
        }
        CommandResult::Attach(paths)
    }

    pub fn list(names: &[String]) -> CommandResult {
        if names.is_empty() {
            return CommandResult::Message("No files attached.".to_string());
        }
        let mut out = String::from("Attached files:");
        for (i, name) in names.iter().enumerate() {
            out.push_str(&format!("\n  {}: {}", i, name));
        }
        CommandResult::Message(out)
    }

    pub fn detach(args: &str, count: usize) -> CommandResult {
        if count == 0 {
            return CommandResult::Message("No files attached.".to_string());
        }
        match parse_index(args, count) {
            Ok(index) => CommandResult::Detach(index),
            Err(msg) => CommandResult::Message(msg),
        }
    }
}
