//! Tiered command resolution
//!
//! Maps free-form input to an `Action` by trying, in order:
//!
//! 1. the whole normalized input as a pattern phrase
//! 2. the first token as a builtin, a pattern phrase, or a command key
//! 3. fuzzy matching: the whole input against pattern phrases, then the
//!    first token against command keys
//! 4. the input itself as a shell command line
//!
//! The first tier that produces an action wins. Resolution is pure: it reads
//! the tables and never executes anything.

use crate::actions::{Action, Resolution, ResolveError, Tier};
use crate::builtins::BuiltinLookup;
use crate::normalize::{collapse_whitespace, join_args, split_head};
use crate::similarity::{best_match, DEFAULT_CUTOFF};
use crate::tables::CommandTables;

/// Tunables for the cascade
#[derive(Clone, Debug, PartialEq)]
pub struct ResolveOptions {
    /// Minimum similarity for a fuzzy match (inclusive)
    pub fuzzy_cutoff: f64,
    /// Fall back to running the raw input; otherwise yield `NoMatch`
    pub shell_passthrough: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            fuzzy_cutoff: DEFAULT_CUTOFF,
            shell_passthrough: true,
        }
    }
}

/// Resolve input with default options
pub fn parse(
    input: &str,
    tables: &CommandTables,
    builtins: &impl BuiltinLookup,
    os: &str,
) -> Result<Action, ResolveError> {
    Resolver::new(tables, builtins, os)
        .resolve(input)
        .map(|r| r.action)
}

/// Borrowed view over the tables for one platform
pub struct Resolver<'a, B: BuiltinLookup> {
    tables: &'a CommandTables,
    builtins: &'a B,
    os: String,
    options: ResolveOptions,
}

impl<'a, B: BuiltinLookup> Resolver<'a, B> {
    pub fn new(tables: &'a CommandTables, builtins: &'a B, os: &str) -> Self {
        Self {
            tables,
            builtins,
            os: os.to_lowercase(),
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the cascade; only empty input is an error
    pub fn resolve(&self, input: &str) -> Result<Resolution, ResolveError> {
        let normalized = collapse_whitespace(input);
        let (head, tail) = split_head(&normalized).ok_or(ResolveError::NoActionableInput)?;
        let lowered = normalized.to_lowercase();

        let resolution = self
            .exact_pattern(&lowered)
            .or_else(|| self.head_match(&head, &tail))
            .or_else(|| self.fuzzy_pattern(&lowered))
            .or_else(|| self.fuzzy_command(&head, &tail))
            .unwrap_or_else(|| self.fallback(&normalized));

        tracing::debug!(
            input = %normalized,
            tier = ?resolution.tier,
            action = %resolution.action.describe(),
            "resolved"
        );
        Ok(resolution)
    }

    /// Tier 1: the whole input is a pattern phrase
    fn exact_pattern(&self, lowered: &str) -> Option<Resolution> {
        let key = self.tables.patterns.get(lowered)?;
        self.resolve_key(key, &[])
            .map(|action| Resolution::new(Tier::ExactPattern, action))
    }

    /// Tier 2: the first token names something directly
    fn head_match(&self, head: &str, tail: &[String]) -> Option<Resolution> {
        if self.builtins.is_builtin(head) {
            return Some(Resolution::new(
                Tier::HeadBuiltin,
                Action::builtin(head, tail.to_vec()),
            ));
        }

        if let Some(key) = self.tables.patterns.get(head) {
            if let Some(action) = self.resolve_key(key, tail) {
                return Some(Resolution::new(Tier::HeadPattern, action));
            }
        }

        self.tables
            .commands
            .template(head, &self.os)
            .map(|template| Resolution::new(Tier::HeadCommand, Action::shell(join_args(template, tail))))
    }

    /// Tier 3a: the whole input is close to a pattern phrase; the tail is dropped
    fn fuzzy_pattern(&self, lowered: &str) -> Option<Resolution> {
        let (phrase, score) = best_match(
            lowered,
            self.tables.patterns.phrases(),
            self.options.fuzzy_cutoff,
        )?;
        let key = self.tables.patterns.get(phrase)?;
        tracing::debug!(phrase, score, "fuzzy pattern candidate");
        self.resolve_key(key, &[])
            .map(|action| Resolution::new(Tier::FuzzyPattern, action))
    }

    /// Tier 3b: the first token is close to a command key; the tail is kept
    fn fuzzy_command(&self, head: &str, tail: &[String]) -> Option<Resolution> {
        let (key, score) = best_match(
            head,
            self.tables.commands.keys(),
            self.options.fuzzy_cutoff,
        )?;
        tracing::debug!(key, score, "fuzzy command candidate");
        self.tables
            .commands
            .template(key, &self.os)
            .map(|template| Resolution::new(Tier::FuzzyCommand, Action::shell(join_args(template, tail))))
    }

    /// Tier 4: run the input as typed, or give up
    fn fallback(&self, normalized: &str) -> Resolution {
        if self.options.shell_passthrough {
            Resolution::new(Tier::Passthrough, Action::shell(normalized))
        } else {
            Resolution::new(Tier::Unmatched, Action::NoMatch)
        }
    }

    /// A canonical key becomes a builtin call or an OS-specific command line
    fn resolve_key(&self, key: &str, args: &[String]) -> Option<Action> {
        if self.builtins.is_builtin(key) {
            return Some(Action::builtin(key, args.to_vec()));
        }
        self.tables
            .commands
            .template(key, &self.os)
            .map(|template| Action::shell(join_args(template, args)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{CommandTable, PatternTable};
    use std::collections::BTreeSet;

    fn builtins(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn tables() -> CommandTables {
        let patterns = PatternTable::from_pairs([
            ("show system info", "sysinfo"),
            ("list all files", "ls"),
            ("disk usage", "df"),
            ("list", "ls"),
            ("nothing here", "ghost"),
        ]);
        let mut commands = CommandTable::new();
        commands.insert_pairs("ls", &[("linux", "ls"), ("windows", "dir")]);
        commands.insert_pairs("listdir", &[("linux", "ls"), ("windows", "dir")]);
        commands.insert_pairs("df", &[("linux", "df -h"), ("windows", "wmic logicaldisk")]);
        commands.insert_pairs("uptime", &[("linux", "uptime")]);
        commands.insert_pairs("orphan", &[("darwin", "open")]);
        CommandTables::new(patterns, commands)
    }

    fn resolve(input: &str, os: &str) -> Resolution {
        let tables = tables();
        let builtins = builtins(&["sysinfo", "zip"]);
        Resolver::new(&tables, &builtins, os).resolve(input).unwrap()
    }

    #[test]
    fn test_empty_input_is_distinct() {
        let tables = tables();
        let builtins = builtins(&[]);
        let resolver = Resolver::new(&tables, &builtins, "linux");
        assert_eq!(resolver.resolve(""), Err(ResolveError::NoActionableInput));
        assert_eq!(resolver.resolve(" \t\n "), Err(ResolveError::NoActionableInput));
    }

    #[test]
    fn test_exact_pattern_to_builtin() {
        let r = resolve("Show   System Info", "linux");
        assert_eq!(r.tier, Tier::ExactPattern);
        assert_eq!(r.action, Action::builtin("sysinfo", vec![]));
    }

    #[test]
    fn test_exact_pattern_to_shell() {
        let r = resolve("disk usage", "windows");
        assert_eq!(r.tier, Tier::ExactPattern);
        assert_eq!(r.action, Action::shell("wmic logicaldisk"));
    }

    #[test]
    fn test_exact_pattern_beats_head_builtin() {
        let tables = tables();
        let builtins = builtins(&["ls", "list"]);
        let r = Resolver::new(&tables, &builtins, "linux")
            .resolve("list all files")
            .unwrap();
        assert_eq!(r.tier, Tier::ExactPattern);
        assert_eq!(r.action, Action::builtin("ls", vec![]));
    }

    #[test]
    fn test_head_builtin_keeps_tail() {
        let r = resolve("ZIP Reports/ out.zip", "linux");
        assert_eq!(r.tier, Tier::HeadBuiltin);
        assert_eq!(
            r.action,
            Action::builtin("zip", vec!["Reports/".into(), "out.zip".into()])
        );
    }

    #[test]
    fn test_head_pattern_appends_tail() {
        let r = resolve("list /tmp", "windows");
        assert_eq!(r.tier, Tier::HeadPattern);
        assert_eq!(r.action, Action::shell("dir /tmp"));
    }

    #[test]
    fn test_head_command_with_os() {
        let r = resolve("listdir -a", "windows");
        assert_eq!(r.tier, Tier::HeadCommand);
        assert_eq!(r.action, Action::shell("dir -a"));
    }

    #[test]
    fn test_os_fallback_to_linux() {
        let r = resolve("uptime", "windows");
        assert_eq!(r.action, Action::shell("uptime"));
    }

    #[test]
    fn test_missing_templates_yield_args_only() {
        let r = resolve("orphan x y", "windows");
        assert_eq!(r.tier, Tier::HeadCommand);
        assert_eq!(r.action, Action::shell("x y"));
    }

    #[test]
    fn test_fuzzy_pattern_drops_tail() {
        let r = resolve("show sytem info", "linux");
        assert_eq!(r.tier, Tier::FuzzyPattern);
        assert_eq!(r.action, Action::builtin("sysinfo", vec![]));
    }

    #[test]
    fn test_fuzzy_command_keeps_tail() {
        let r = resolve("uptme --pretty", "linux");
        assert_eq!(r.tier, Tier::FuzzyCommand);
        assert_eq!(r.action, Action::shell("uptime --pretty"));
    }

    #[test]
    fn test_dangling_pattern_falls_through() {
        let r = resolve("nothing here", "linux");
        assert_eq!(r.tier, Tier::Passthrough);
        assert_eq!(r.action, Action::shell("nothing here"));
    }

    #[test]
    fn test_passthrough_keeps_input() {
        let r = resolve("  git   commit -m wip ", "linux");
        assert_eq!(r.tier, Tier::Passthrough);
        assert_eq!(r.action, Action::shell("git commit -m wip"));
    }

    #[test]
    fn test_passthrough_disabled_gives_no_match() {
        let tables = tables();
        let builtins = builtins(&[]);
        let r = Resolver::new(&tables, &builtins, "linux")
            .with_options(ResolveOptions {
                shell_passthrough: false,
                ..ResolveOptions::default()
            })
            .resolve("git status")
            .unwrap();
        assert_eq!(r.tier, Tier::Unmatched);
        assert_eq!(r.action, Action::NoMatch);
    }

    #[test]
    fn test_fuzzy_cutoff_is_inclusive() {
        let patterns = PatternTable::from_pairs([("abcxy", "up")]);
        let mut commands = CommandTable::new();
        commands.insert_pairs("up", &[("linux", "uptime")]);
        let tables = CommandTables::new(patterns, commands);
        let builtins = builtins(&[]);
        let resolver = Resolver::new(&tables, &builtins, "linux");

        // ratio("abcde", "abcxy") == 0.6
        let r = resolver.resolve("abcde").unwrap();
        assert_eq!(r.tier, Tier::FuzzyPattern);
        assert_eq!(r.action, Action::shell("uptime"));

        let strict = Resolver::new(&tables, &builtins, "linux").with_options(ResolveOptions {
            fuzzy_cutoff: 0.61,
            ..ResolveOptions::default()
        });
        assert_eq!(strict.resolve("abcde").unwrap().tier, Tier::Passthrough);
    }

    #[test]
    fn test_parse_free_function() {
        let tables = tables();
        let builtins = builtins(&["sysinfo"]);
        let action = parse("Show System Info", &tables, &builtins, "linux").unwrap();
        assert_eq!(action, Action::builtin("sysinfo", vec![]));
    }
}
