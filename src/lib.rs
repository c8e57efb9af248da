//! aish_core - natural-language command resolution for the AISH shell
//!
//! Turns free-form input ("list all files", "delete them", "2 commands ago")
//! into a concrete builtin call or an OS-specific shell command line.
//!
//! Modules:
//! - normalize: whitespace collapsing, case folding, tokenizing
//! - similarity: sequence-matcher ratio and close-match search
//! - tables: pattern and command tables (JSON/YAML, embedded defaults)
//! - builtins: builtin registry and lookup
//! - resolver: tiered matcher (exact, head, fuzzy, passthrough)
//! - context: session history and entity memory
//! - references: "again", "them", "there" and other back-references
//! - entities: entity extraction from executed commands
//! - platform: OS detection and flag vocabularies
//! - executor: shell and builtin execution with timeouts
//! - history_log: persisted, bounded command history
//! - safety: dangerous-command classifier
//! - suggestions: "did you mean" hints
//! - config: YAML configuration
//! - session: one interactive turn, end to end

pub mod actions;
pub mod normalize;
pub mod similarity;
pub mod tables;
pub mod builtins;
pub mod resolver;
pub mod context;
pub mod references;
pub mod entities;
pub mod platform;
pub mod executor;
pub mod history_log;
pub mod safety;
pub mod suggestions;
pub mod config;
pub mod session;

// Re-export key types for convenience
pub use actions::{Action, Resolution, ResolveError, Tier};

pub use tables::{CommandTable, CommandTables, PatternTable, TableError, TableIssue};

pub use builtins::{BuiltinLookup, BuiltinOutput, BuiltinRegistry};

pub use resolver::{parse, ResolveOptions, Resolver};

pub use context::{
    ContextStore, Entities, EntityClass, EntityValue, HistoryEntry, SharedContext,
};

pub use references::{expand, resolve, Expansion, ReferenceRule};

pub use platform::{detect_os, OsFamily};

pub use executor::{ExecOpts, ExecOutcome};

pub use history_log::{HistoryLog, HistoryRecord};

pub use safety::{SafetyChecker, SafetyReport, Verdict};

pub use suggestions::{suggest, Suggestion, SuggestionReason};

pub use config::AishConfig;

pub use session::{Plan, Session, Turn};
