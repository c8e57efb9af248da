//! Command tables consumed by the resolver
//!
//! - Pattern table: natural-language phrase -> canonical command key
//! - Command table: canonical command key -> { os id -> shell template }
//!
//! Keys are normalized (whitespace collapsed, lower-cased) at load time so
//! lookups never have to care about how a table file was written. Tables are
//! JSON or YAML, chosen by file extension.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::builtins::BuiltinLookup;
use crate::normalize::normalize_key;

/// OS id every command entry is expected to provide
pub const FALLBACK_OS: &str = "linux";

const EMBEDDED_PATTERNS: &str = include_str!("../data/patterns.json");
const EMBEDDED_COMMANDS: &str = include_str!("../data/commands.json");

/// Natural-language phrase table (many phrases may map to one key)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct PatternTable {
    entries: BTreeMap<String, String>,
}

impl From<BTreeMap<String, String>> for PatternTable {
    fn from(raw: BTreeMap<String, String>) -> Self {
        let entries = raw
            .into_iter()
            .map(|(phrase, key)| (normalize_key(&phrase), key.trim().to_lowercase()))
            .filter(|(phrase, _)| !phrase.is_empty())
            .collect();
        Self { entries }
    }
}

impl From<PatternTable> for BTreeMap<String, String> {
    fn from(table: PatternTable) -> Self {
        table.entries
    }
}

impl PatternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(phrase, key)` pairs
    pub fn from_pairs<I, P, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, K)>,
        P: Into<String>,
        K: Into<String>,
    {
        let raw: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(p, k)| (p.into(), k.into()))
            .collect();
        raw.into()
    }

    /// Add or replace a phrase
    pub fn insert(&mut self, phrase: &str, key: &str) {
        self.entries
            .insert(normalize_key(phrase), key.trim().to_lowercase());
    }

    /// Look up an already-normalized phrase
    pub fn get(&self, phrase: &str) -> Option<&str> {
        self.entries.get(phrase).map(String::as_str)
    }

    pub fn phrases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(p, k)| (p.as_str(), k.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shell templates for one command key, keyed by OS id
pub type OsTemplates = BTreeMap<String, String>;

/// On-disk shape of a command entry: either per-OS templates or one string
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum RawCommandEntry {
    PerOs(OsTemplates),
    Single(String),
}

/// OS-aware shell command table
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CommandTable {
    entries: BTreeMap<String, OsTemplates>,
}

impl<'de> Deserialize<'de> for CommandTable {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = BTreeMap::<String, RawCommandEntry>::deserialize(deserializer)?;
        let mut table = CommandTable::new();
        for (key, entry) in raw {
            let templates = match entry {
                RawCommandEntry::PerOs(map) => map
                    .into_iter()
                    .map(|(os, template)| (os.to_lowercase(), template))
                    .collect(),
                RawCommandEntry::Single(template) => {
                    OsTemplates::from([(FALLBACK_OS.to_string(), template)])
                }
            };
            table.insert(&key, templates);
        }
        Ok(table)
    }
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a command entry
    pub fn insert(&mut self, key: &str, templates: OsTemplates) {
        let key = normalize_key(key);
        if !key.is_empty() {
            self.entries.insert(key, templates);
        }
    }

    /// Convenience for building entries from `(os, template)` pairs
    pub fn insert_pairs(&mut self, key: &str, pairs: &[(&str, &str)]) {
        let templates = pairs
            .iter()
            .map(|(os, t)| (os.to_lowercase(), t.to_string()))
            .collect();
        self.insert(key, templates);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn entry(&self, key: &str) -> Option<&OsTemplates> {
        self.entries.get(key)
    }

    /// Template for `key` on `os`, falling back to the linux template.
    ///
    /// `None` when the key is unknown. An entry without either template
    /// degrades to the empty string.
    pub fn template(&self, key: &str, os: &str) -> Option<&str> {
        let templates = self.entries.get(key)?;
        let template = templates
            .get(os)
            .or_else(|| templates.get(FALLBACK_OS))
            .map(String::as_str);
        if template.is_none() {
            tracing::warn!(key, os, "command entry has no template for os or linux fallback");
        }
        Some(template.unwrap_or(""))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Both tables the resolver consults
#[derive(Clone, Debug, Default)]
pub struct CommandTables {
    pub patterns: PatternTable,
    pub commands: CommandTable,
}

impl CommandTables {
    pub fn new(patterns: PatternTable, commands: CommandTable) -> Self {
        Self { patterns, commands }
    }

    /// Tables shipped with the crate
    pub fn embedded() -> Result<Self> {
        let patterns: PatternTable = serde_json::from_str(EMBEDDED_PATTERNS)
            .context("Failed to parse embedded pattern table")?;
        let commands: CommandTable = serde_json::from_str(EMBEDDED_COMMANDS)
            .context("Failed to parse embedded command table")?;
        Ok(Self { patterns, commands })
    }

    /// Load tables, using the embedded defaults for any path not given
    pub fn load(patterns_path: Option<&Path>, commands_path: Option<&Path>) -> Result<Self> {
        let mut tables = Self::embedded()?;
        if let Some(path) = patterns_path {
            tables.patterns = load_table(path)?;
        }
        if let Some(path) = commands_path {
            tables.commands = load_table(path)?;
        }
        tracing::debug!(
            patterns = tables.patterns.len(),
            commands = tables.commands.len(),
            "command tables loaded"
        );
        Ok(tables)
    }

    /// Load-time checks; problems are reported, never fatal
    pub fn validate(&self, builtins: &impl BuiltinLookup) -> Vec<TableIssue> {
        let mut issues = Vec::new();

        for key in self.commands.keys() {
            let has_fallback = self
                .commands
                .entry(key)
                .map(|t| t.contains_key(FALLBACK_OS))
                .unwrap_or(false);
            if !has_fallback {
                issues.push(TableIssue::MissingLinuxFallback {
                    key: key.to_string(),
                });
            }
        }

        for (phrase, key) in self.patterns.iter() {
            if !builtins.is_builtin(key) && !self.commands.contains(key) {
                issues.push(TableIssue::DanglingPattern {
                    phrase: phrase.to_string(),
                    key: key.to_string(),
                });
            }
        }

        issues
    }
}

/// Problems found by `CommandTables::validate`
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum TableIssue {
    MissingLinuxFallback { key: String },
    DanglingPattern { phrase: String, key: String },
}

impl std::fmt::Display for TableIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableIssue::MissingLinuxFallback { key } => {
                write!(f, "Command '{}' has no linux fallback template", key)
            }
            TableIssue::DanglingPattern { phrase, key } => write!(
                f,
                "Pattern '{}' maps to '{}', which is neither a builtin nor a command",
                phrase, key
            ),
        }
    }
}

/// Table loading errors
#[derive(Debug)]
pub enum TableError {
    UnsupportedFormat(String),
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::UnsupportedFormat(path) => {
                write!(f, "Unsupported table format (expected .json, .yaml or .yml): {}", path)
            }
        }
    }
}

impl std::error::Error for TableError {}

/// Read a table file as JSON or YAML depending on its extension
pub fn load_table<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read table: {}", path.display()))?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON table: {}", path.display())),
        "yaml" | "yml" => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML table: {}", path.display())),
        _ => Err(TableError::UnsupportedFormat(path.display().to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_pattern_keys_are_normalized() {
        let table = PatternTable::from_pairs([("  Show   System INFO ", "SysInfo")]);
        assert_eq!(table.get("show system info"), Some("sysinfo"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_command_template_os_fallback() {
        let mut table = CommandTable::new();
        table.insert_pairs("ls", &[("linux", "ls -la")]);

        assert_eq!(table.template("ls", "windows"), Some("ls -la"));
        assert_eq!(table.template("ls", "linux"), Some("ls -la"));
        assert_eq!(table.template("nope", "linux"), None);
    }

    #[test]
    fn test_missing_templates_degrade_to_empty() {
        let mut table = CommandTable::new();
        table.insert_pairs("only-mac", &[("darwin", "open .")]);
        assert_eq!(table.template("only-mac", "windows"), Some(""));
    }

    #[test]
    fn test_single_string_command_entry() {
        let table: CommandTable =
            serde_json::from_str(r#"{"Up": "uptime", "ls": {"Windows": "dir", "linux": "ls"}}"#)
                .unwrap();
        assert_eq!(table.template("up", "darwin"), Some("uptime"));
        assert_eq!(table.template("ls", "windows"), Some("dir"));
    }

    #[test]
    fn test_embedded_tables_parse() {
        let tables = CommandTables::embedded().unwrap();
        assert!(!tables.patterns.is_empty());
        assert!(tables.commands.contains("ls"));
        assert_eq!(tables.commands.template("ls", "windows"), Some("dir"));
    }

    #[test]
    fn test_embedded_tables_are_consistent() {
        let tables = CommandTables::embedded().unwrap();
        let builtins: BTreeSet<String> = ["sysinfo", "cwd", "safety"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(tables.validate(&builtins).is_empty());
    }

    #[test]
    fn test_validate_reports_issues() {
        let mut commands = CommandTable::new();
        commands.insert_pairs("open", &[("darwin", "open")]);
        let patterns = PatternTable::from_pairs([("launch it", "missing")]);
        let tables = CommandTables::new(patterns, commands);

        let issues = tables.validate(&BTreeSet::<String>::new());
        assert_eq!(issues.len(), 2);
        assert!(issues.contains(&TableIssue::MissingLinuxFallback { key: "open".into() }));
        assert!(issues.contains(&TableIssue::DanglingPattern {
            phrase: "launch it".into(),
            key: "missing".into(),
        }));
    }

    #[test]
    fn test_load_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("patterns.yaml");
        fs::write(&yaml_path, "\"List Files\": ls\n").unwrap();
        let patterns: PatternTable = load_table(&yaml_path).unwrap();
        assert_eq!(patterns.get("list files"), Some("ls"));

        let json_path = dir.path().join("commands.json");
        fs::write(&json_path, r#"{"ls": {"linux": "ls"}}"#).unwrap();
        let tables = CommandTables::load(Some(&yaml_path), Some(&json_path)).unwrap();
        assert_eq!(tables.commands.len(), 1);
        assert_eq!(tables.patterns.len(), 1);
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.txt");
        fs::write(&path, "{}").unwrap();
        let err = load_table::<PatternTable>(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported table format"));
    }
}
