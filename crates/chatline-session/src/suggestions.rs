//! Suggestion cards offered in a fresh conversation

use serde::{Deserialize, Serialize};

/// A canned opening question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionCard {
    #[serde(default)]
    pub icon: String,
    pub title: String,
    pub question: String,
}

impl SuggestionCard {
    pub fn new(icon: &str, title: &str, question: &str) -> Self {
        Self {
            icon: icon.to_string(),
            title: title.to_string(),
            question: question.to_string(),
        }
    }
}

/// Cards used when the configuration does not list any
pub fn default_cards() -> Vec<SuggestionCard> {
    vec![
        SuggestionCard::new(
            "lightbulb",
            "Code Analysis",
            "Can you review my code for potential improvements?",
        ),
        SuggestionCard::new(
            "code",
            "Debug Help",
            "I'm getting an error in my code. Can you help me fix it?",
        ),
        SuggestionCard::new(
            "settings",
            "Best Practices",
            "What are the best practices for state management in React?",
        ),
        SuggestionCard::new(
            "monitor",
            "New Features",
            "How can I implement authentication in my app?",
        ),
    ]
}
