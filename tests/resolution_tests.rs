// tests/resolution_tests.rs
// End-to-end resolution through the public API: references, then tiers

use std::collections::BTreeSet;

use aish_core::{
    parse, resolve, Action, CommandTable, CommandTables, ContextStore, Entities, PatternTable,
    ResolveError, Resolver, Tier,
};
use insta::assert_json_snapshot;

fn builtins(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn history(commands: &[&str]) -> ContextStore {
    let mut ctx = ContextStore::new();
    for cmd in commands {
        ctx.append(*cmd, None, None, Entities::new(), 0);
    }
    ctx
}

#[test]
fn show_system_info_resolves_to_builtin() {
    let tables = CommandTables::new(
        PatternTable::from_pairs([("show system info", "sysinfo")]),
        CommandTable::new(),
    );
    let action = parse("Show System Info", &tables, &builtins(&["sysinfo"]), "linux").unwrap();
    assert_eq!(action, Action::builtin("sysinfo", vec![]));
}

#[test]
fn listdir_on_windows_uses_windows_template() {
    let mut commands = CommandTable::new();
    commands.insert_pairs("listdir", &[("linux", "ls"), ("windows", "dir")]);
    let tables = CommandTables::new(PatternTable::new(), commands);

    let resolution = Resolver::new(&tables, &builtins(&[]), "windows")
        .resolve("listdir -a")
        .unwrap();
    assert_eq!(resolution.tier, Tier::HeadCommand);

    assert_json_snapshot!(resolution.action, @r###"
    {
      "kind": "shell",
      "command_line": "dir -a"
    }
    "###);
}

#[test]
fn whole_pattern_wins_over_builtin_head() {
    let tables = CommandTables::new(
        PatternTable::from_pairs([("list all files", "ls")]),
        CommandTable::new(),
    );
    let resolution = Resolver::new(&tables, &builtins(&["ls", "list"]), "linux")
        .resolve("list all files")
        .unwrap();
    assert_eq!(resolution.tier, Tier::ExactPattern);
    assert_eq!(resolution.action, Action::builtin("ls", vec![]));
}

#[test]
fn missing_os_template_falls_back_to_linux() {
    let mut commands = CommandTable::new();
    commands.insert_pairs("ll", &[("linux", "ls -la")]);
    let tables = CommandTables::new(PatternTable::new(), commands);

    let action = parse("ll", &tables, &builtins(&[]), "windows").unwrap();
    assert_eq!(action, Action::shell("ls -la"));
}

#[test]
fn fuzzy_cutoff_boundary() {
    let mut commands = CommandTable::new();
    commands.insert_pairs("up", &[("linux", "uptime")]);

    // ratio("abcde", "abcxy") is exactly 0.6
    let at_cutoff = CommandTables::new(PatternTable::from_pairs([("abcxy", "up")]), commands.clone());
    let action = parse("abcde", &at_cutoff, &builtins(&[]), "linux").unwrap();
    assert_eq!(action, Action::shell("uptime"));

    // ratio("abcdefgh", "abcdexxxx") is 10/17, just under
    let below = CommandTables::new(PatternTable::from_pairs([("abcdexxxx", "up")]), commands);
    let resolution = Resolver::new(&below, &builtins(&[]), "linux")
        .resolve("abcdefgh")
        .unwrap();
    assert_eq!(resolution.tier, Tier::Passthrough);
    assert_eq!(resolution.action, Action::shell("abcdefgh"));
}

#[test]
fn unmatched_input_passes_through_normalized() {
    let tables = CommandTables::embedded().unwrap();
    let action = parse("  git   log --oneline  ", &tables, &builtins(&[]), "linux").unwrap();
    assert_eq!(action, Action::shell("git log --oneline"));
}

#[test]
fn empty_input_is_not_a_match() {
    let tables = CommandTables::embedded().unwrap();
    assert_eq!(
        parse(" \t ", &tables, &builtins(&[]), "linux"),
        Err(ResolveError::NoActionableInput)
    );
}

#[test]
fn one_command_ago_returns_last_command() {
    let ctx = history(&["ls /tmp", "cd /var"]);
    assert_eq!(resolve("1 commands ago", &ctx, "linux"), "cd /var");
}

#[test]
fn commands_ago_beyond_history_is_unchanged() {
    let ctx = history(&["a", "b", "c"]);
    assert_eq!(resolve("5 commands ago", &ctx, "linux"), "5 commands ago");
    assert_eq!(resolve("2 commands ago", &ctx, "linux"), "b");
}

#[test]
fn again_is_idempotent() {
    let ctx = history(&["ls /tmp", "cd /var"]);
    let first = resolve("again", &ctx, "linux");
    assert_eq!(first, resolve("again", &ctx, "linux"));
    assert_eq!(first, "cd /var");
}

#[test]
fn reference_then_resolve_with_embedded_tables() {
    let tables = CommandTables::embedded().unwrap();
    let ctx = history(&["ls /tmp"]);

    let expanded = resolve("with details", &ctx, "linux");
    assert_eq!(expanded, "ls /tmp -l");

    let action = parse(&expanded, &tables, &builtins(&[]), "linux").unwrap();
    assert_eq!(action, Action::shell("ls /tmp -l"));
}

#[test]
fn repeat_of_templated_command_resolves_once() {
    let tables = CommandTables::embedded().unwrap();
    let ctx = history(&["df"]);

    let expanded = resolve("again", &ctx, "linux");
    assert_eq!(expanded, "df");
    let action = parse(&expanded, &tables, &builtins(&[]), "linux").unwrap();
    assert_eq!(action, Action::shell("df -h"));
}

#[test]
fn modifier_words_in_literal_commands_pass_through() {
    let tables = CommandTables::embedded().unwrap();
    let ctx = history(&["ls /tmp"]);

    for literal in ["cat details.txt", "echo go to bed"] {
        let expanded = resolve(literal, &ctx, "linux");
        assert_eq!(expanded, literal);
        let action = parse(&expanded, &tables, &builtins(&[]), "linux").unwrap();
        assert_eq!(action, Action::shell(literal));
    }
}
