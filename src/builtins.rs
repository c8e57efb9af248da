//! Builtin command registry
//!
//! The resolver only needs to know which names are builtins; the host owns
//! the registry and invokes handlers after resolution.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use crate::platform;
use crate::safety;

/// Name lookup used by the resolver and table validation
pub trait BuiltinLookup {
    /// `name` is already case-folded
    fn is_builtin(&self, name: &str) -> bool;
}

impl BuiltinLookup for BTreeSet<String> {
    fn is_builtin(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl BuiltinLookup for HashSet<String> {
    fn is_builtin(&self, name: &str) -> bool {
        self.contains(name)
    }
}

/// Printed output and exit status of a builtin
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BuiltinOutput {
    pub output: String,
    pub exit_code: i32,
}

impl BuiltinOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            exit_code: 0,
        }
    }

    pub fn failed(output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            output: output.into(),
            exit_code,
        }
    }
}

pub type BuiltinHandler = Arc<dyn Fn(&[String]) -> Result<BuiltinOutput> + Send + Sync>;

struct BuiltinEntry {
    summary: String,
    handler: BuiltinHandler,
}

/// Name -> handler registry (names are case-insensitive)
#[derive(Default)]
pub struct BuiltinRegistry {
    entries: BTreeMap<String, BuiltinEntry>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the host builtins (`sysinfo`, `cwd`, `safety`)
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("sysinfo", "Show OS, architecture and host details", sysinfo);
        registry.register("cwd", "Print the current working directory", cwd);
        registry.register("safety", "Check a command for dangerous patterns", safety_check);
        registry
    }

    /// Register (or replace) a builtin
    pub fn register<F>(&mut self, name: &str, summary: &str, handler: F)
    where
        F: Fn(&[String]) -> Result<BuiltinOutput> + Send + Sync + 'static,
    {
        self.entries.insert(
            name.trim().to_lowercase(),
            BuiltinEntry {
                summary: summary.to_string(),
                handler: Arc::new(handler),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_lowercase())
    }

    /// Run a builtin; unknown names are an error
    pub fn invoke(&self, name: &str, args: &[String]) -> Result<BuiltinOutput> {
        let entry = self
            .entries
            .get(&name.to_lowercase())
            .ok_or_else(|| anyhow::anyhow!("Unknown builtin: {}", name))?;
        (entry.handler)(args)
    }

    /// `(name, summary)` pairs in name order
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|(name, e)| (name.as_str(), e.summary.as_str()))
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl BuiltinLookup for BuiltinRegistry {
    fn is_builtin(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl std::fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinRegistry")
            .field("names", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn sysinfo(_args: &[String]) -> Result<BuiltinOutput> {
    let host = std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let lines = [
        format!("OS:     {}", platform::detect_os()),
        format!("Family: {}", platform::OsFamily::current()),
        format!("Arch:   {}", std::env::consts::ARCH),
        format!("Host:   {}", host),
        format!("User:   {}", user),
    ];
    Ok(BuiltinOutput::ok(lines.join("\n")))
}

fn cwd(_args: &[String]) -> Result<BuiltinOutput> {
    let dir = std::env::current_dir()?;
    Ok(BuiltinOutput::ok(dir.display().to_string()))
}

fn safety_check(args: &[String]) -> Result<BuiltinOutput> {
    if args.is_empty() {
        return Ok(BuiltinOutput::failed("Usage: safety <command>", 2));
    }
    let report = safety::check(&args.join(" "));
    Ok(BuiltinOutput {
        output: report.to_string(),
        exit_code: if report.is_safe() { 0 } else { 1 },
    })
}
