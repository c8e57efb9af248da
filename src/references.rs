//! Reference resolution
//!
//! Rewrites utterances that point at earlier commands ("again", "3 commands
//! ago", "delete them", "list there", "with details") into literal command
//! text before tiered matching. Rules are tried in order and the first one
//! whose precondition holds wins. Without applicable context the input comes
//! back unchanged; nothing here fails.

use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::context::{ContextStore, EntityClass};
use crate::normalize::{collapse_whitespace, normalize_key, quote_if_needed};
use crate::platform::OsFamily;

const REPEAT_WORDS: [&str; 4] = ["again", "repeat", "that", "same"];

/// Which rule rewrote the input
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceRule {
    Repeat,
    CommandsAgo,
    Them,
    It,
    There,
    Detail,
    SizeSort,
    Navigate,
}

/// Outcome of reference resolution
#[derive(Clone, Debug, PartialEq)]
pub struct Expansion {
    pub text: String,
    /// `None` when the input came back unchanged
    pub rule: Option<ReferenceRule>,
}

impl Expansion {
    fn rewritten(rule: ReferenceRule, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            rule: Some(rule),
        }
    }

    fn unchanged(text: &str) -> Self {
        Self {
            text: text.to_string(),
            rule: None,
        }
    }
}

struct Rules {
    commands_ago: Regex,
    them: Regex,
    it: Regex,
    there: Regex,
    detail: Regex,
    size_sort: Regex,
    navigate: Regex,
}

fn rules() -> &'static Rules {
    static RULES: OnceLock<Rules> = OnceLock::new();
    RULES.get_or_init(|| Rules {
        commands_ago: Regex::new(r"^(\d+) commands? ago$").expect("valid regex"),
        them: Regex::new(r"(?i)\b(?:them|those)\b").expect("valid regex"),
        it: Regex::new(r"(?i)\bit\b").expect("valid regex"),
        there: Regex::new(r"(?i)\bthere\b").expect("valid regex"),
        detail: Regex::new(
            r"^(?:in detail|with details?|show details?|more details?|detailed|details)$",
        )
        .expect("valid regex"),
        size_sort: Regex::new(
            r"^(?:sort(?:ed)? by size|by size|largest first|biggest first)$",
        )
        .expect("valid regex"),
        navigate: Regex::new(r"(?i)^(?:go|move|switch|now)\b.*\b(?:in|to)\s+(\S+)$")
            .expect("valid regex"),
    })
}

/// Rewrite `text` using the session context; unchanged when no rule applies.
pub fn resolve(text: &str, context: &ContextStore, os: &str) -> String {
    expand(text, context, os).text
}

/// Like `resolve`, also reporting which rule fired
pub fn expand(text: &str, context: &ContextStore, os: &str) -> Expansion {
    let rules = rules();
    let collapsed = collapse_whitespace(text);
    let normalized = normalize_key(text);
    let family = OsFamily::from_os_id(os);
    let previous = context.last_command(1);

    // 1. exact repeat words
    if REPEAT_WORDS.contains(&normalized.as_str()) {
        return match previous {
            Some(cmd) => Expansion::rewritten(ReferenceRule::Repeat, cmd),
            None => Expansion::unchanged(text),
        };
    }

    // 2. "N commands ago"
    if let Some(caps) = rules.commands_ago.captures(&normalized) {
        let target = caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|n| context.last_command(n));
        return match target {
            Some(cmd) => Expansion::rewritten(ReferenceRule::CommandsAgo, cmd),
            None => {
                tracing::debug!(input = %text, "history reference out of range");
                Expansion::unchanged(text)
            }
        };
    }

    // 3. "them" -> last files
    let files = context.entity_list(EntityClass::Files);
    if !files.is_empty() && rules.them.is_match(&collapsed) {
        let joined = files
            .iter()
            .map(|f| quote_if_needed(f))
            .collect::<Vec<_>>()
            .join(" ");
        let rewritten = rules.them.replace_all(&collapsed, NoExpand(&joined));
        return Expansion::rewritten(ReferenceRule::Them, rewritten.into_owned());
    }

    // 4. "it" -> last process
    if let Some(process) = context.entity_text(EntityClass::Process) {
        if rules.it.is_match(&collapsed) {
            let rewritten = rules.it.replace_all(&collapsed, NoExpand(process));
            return Expansion::rewritten(ReferenceRule::It, rewritten.into_owned());
        }
    }

    // 5. "there" -> list last directory
    if let Some(dir) = context.entity_text(EntityClass::Dir) {
        if rules.there.is_match(&collapsed) {
            let listing = format!("{} {}", family.list_dir(), quote_if_needed(dir));
            return Expansion::rewritten(ReferenceRule::There, listing);
        }
    }

    // 6-8. modifiers on the previous command; the whole input must be the modifier
    if let Some(prev) = previous {
        if rules.detail.is_match(&normalized) {
            return Expansion::rewritten(
                ReferenceRule::Detail,
                with_flag(prev, family.detail_flag()),
            );
        }

        if rules.size_sort.is_match(&normalized) {
            return Expansion::rewritten(
                ReferenceRule::SizeSort,
                with_flag(prev, family.size_sort_flag()),
            );
        }

        if let Some(caps) = rules.navigate.captures(&collapsed) {
            let target = caps[1].to_string();
            return Expansion::rewritten(
                ReferenceRule::Navigate,
                format!("{} {}", prev, target),
            );
        }
    }

    Expansion::unchanged(text)
}

/// Append `flag` unless the command already carries it
fn with_flag(command: &str, flag: &str) -> String {
    if command.split_whitespace().any(|t| t == flag) {
        command.to_string()
    } else {
        format!("{} {}", command, flag)
    }
}
