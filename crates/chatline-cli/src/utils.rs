//! Shared utilities

use chatline_session::Theme;
use serde_json::Value;

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// One-line preview of a turn for listings
pub fn preview(text: &str, max: usize) -> String {
    truncate_chars(&text.replace('\n', " "), max)
}

/// Render one context value: lists joined by commas, numbers to two places
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Number(n) => match n.as_f64() {
            Some(f) => format!("{:.2}", f),
            None => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a context payload as `key: value` lines
pub fn format_context(context: &serde_json::Map<String, Value>) -> String {
    context
        .iter()
        .map(|(key, value)| format!("  {}: {}", key, format_value(value)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// ANSI colors for speaker labels
pub struct Palette {
    pub user: &'static str,
    pub bot: &'static str,
    pub dim: &'static str,
}

pub const RESET: &str = "\x1b[0m";

impl Palette {
    /// No escapes, for output that is not a terminal
    pub fn plain() -> Self {
        Self {
            user: "",
            bot: "",
            dim: "",
        }
    }

    pub fn reset(&self) -> &'static str {
        if self.user.is_empty() { "" } else { RESET }
    }

    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                user: "\x1b[34m",
                bot: "\x1b[32m",
                dim: "\x1b[90m",
            },
            Theme::Dark => Self {
                user: "\x1b[96m",
                bot: "\x1b[92m",
                dim: "\x1b[37m",
            },
        }
    }
}
