//! "Did you mean" suggestions
//!
//! Offered after a command fails or nothing matches. Candidates come from the
//! pattern table (phrases sharing a word with the input), command keys and
//! builtin names mentioned in the input. They are ranked by similarity to the
//! input and capped at `MAX_SUGGESTIONS`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::builtins::BuiltinRegistry;
use crate::normalize::normalize_key;
use crate::similarity::ratio;
use crate::tables::CommandTables;

pub const MAX_SUGGESTIONS: usize = 5;

/// Shown when there is nothing better to offer
pub const FALLBACK_HINTS: [&str; 2] = [
    "Type 'help' to see available commands",
    "Try simple commands like 'list files' or 'sysinfo'",
];

/// Where a suggestion came from
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SuggestionReason {
    Pattern { phrase: String, key: String },
    Command { key: String },
    Builtin { name: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub reason: SuggestionReason,
    /// Similarity to the input (0.0 - 1.0)
    pub score: f64,
}

impl Suggestion {
    /// The text that was compared against the input
    fn candidate(&self) -> &str {
        match &self.reason {
            SuggestionReason::Pattern { phrase, .. } => phrase,
            SuggestionReason::Command { key } => key,
            SuggestionReason::Builtin { name } => name,
        }
    }
}

impl std::fmt::Display for Suggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reason {
            SuggestionReason::Pattern { phrase, key } => write!(f, "Try: '{}' → {}", phrase, key),
            SuggestionReason::Command { key } => write!(f, "Command available: {}", key),
            SuggestionReason::Builtin { name } => write!(f, "Built-in command: {}", name),
        }
    }
}

/// Collect and rank suggestions for `input`
pub fn suggest(input: &str, tables: &CommandTables, builtins: &BuiltinRegistry) -> Vec<Suggestion> {
    let lowered = normalize_key(input);
    if lowered.is_empty() {
        return Vec::new();
    }
    let words: BTreeSet<&str> = lowered.split(' ').collect();

    let mut found: Vec<Suggestion> = Vec::new();
    let push = |reason: SuggestionReason, found: &mut Vec<Suggestion>| {
        let mut suggestion = Suggestion { reason, score: 0.0 };
        suggestion.score = ratio(&lowered, suggestion.candidate());
        found.push(suggestion);
    };

    for (phrase, key) in tables.patterns.iter() {
        if phrase.split(' ').any(|w| words.contains(w)) {
            push(
                SuggestionReason::Pattern {
                    phrase: phrase.to_string(),
                    key: key.to_string(),
                },
                &mut found,
            );
        }
    }

    for key in tables.commands.keys() {
        if words.contains(key) {
            push(SuggestionReason::Command { key: key.to_string() }, &mut found);
        }
    }

    for name in builtins.names() {
        if words.contains(name) {
            push(SuggestionReason::Builtin { name: name.to_string() }, &mut found);
        }
    }

    // stable: equal scores keep table order
    found.sort_by(|a, b| b.score.total_cmp(&a.score));
    found.truncate(MAX_SUGGESTIONS);
    found
}
