//! Per-turn feedback on bot replies

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A rating on one bot reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Positive,
    Negative,
}

/// Feedback keyed by turn index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackLog {
    entries: BTreeMap<usize, Feedback>,
}

impl FeedbackLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<Feedback> {
        self.entries.get(&index).copied()
    }

    /// Record `feedback` on a turn; recording the current value again clears
    /// it. Returns the resulting state.
    pub fn toggle(&mut self, index: usize, feedback: Feedback) -> Option<Feedback> {
        if self.entries.get(&index) == Some(&feedback) {
            self.entries.remove(&index);
            None
        } else {
            self.entries.insert(index, feedback);
            Some(feedback)
        }
    }

    /// Forget the feedback on one turn
    pub fn remove(&mut self, index: usize) -> Option<Feedback> {
        self.entries.remove(&index)
    }

    /// Drop entries for turns at `len` and beyond
    pub fn truncate(&mut self, len: usize) {
        self.entries.split_off(&len);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Feedback)> + '_ {
        self.entries.iter().map(|(index, feedback)| (*index, *feedback))
    }
}
