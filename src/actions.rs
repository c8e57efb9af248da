//! Resolved actions - the output of the tiered matcher.
//!
//! An `Action` is a decision about what to run, never the run itself.

use serde::{Deserialize, Serialize};

/// What the host should execute for a piece of user input
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Invoke a registered builtin by name
    Builtin { name: String, args: Vec<String> },
    /// Run a fully substituted command line in the platform shell
    Shell { command_line: String },
    /// Nothing matched and shell passthrough is disabled
    NoMatch,
}

impl Action {
    pub fn builtin(name: impl Into<String>, args: Vec<String>) -> Self {
        Action::Builtin {
            name: name.into(),
            args,
        }
    }

    pub fn shell(command_line: impl Into<String>) -> Self {
        Action::Shell {
            command_line: command_line.into(),
        }
    }

    /// Human-readable one-liner for logs and the CLI
    pub fn describe(&self) -> String {
        match self {
            Action::Builtin { name, args } if args.is_empty() => format!("builtin {}", name),
            Action::Builtin { name, args } => format!("builtin {} {}", name, args.join(" ")),
            Action::Shell { command_line } => format!("shell {}", command_line),
            Action::NoMatch => "no match".to_string(),
        }
    }
}

/// The stage of the cascade that produced an action
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    ExactPattern,
    HeadBuiltin,
    HeadPattern,
    HeadCommand,
    FuzzyPattern,
    FuzzyCommand,
    Passthrough,
    Unmatched,
}

/// An action together with the tier that produced it
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub action: Action,
    pub tier: Tier,
}

impl Resolution {
    pub(crate) fn new(tier: Tier, action: Action) -> Self {
        Self { action, tier }
    }
}

/// Resolution errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Input was empty after whitespace normalization
    NoActionableInput,
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::NoActionableInput => write!(f, "No actionable input"),
        }
    }
}

impl std::error::Error for ResolveError {}
