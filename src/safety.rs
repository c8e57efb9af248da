//! Dangerous command classifier
//!
//! Flags destructive shell commands before they run. This is advisory only:
//! the host decides whether to ask for confirmation, nothing is blocked here.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// How risky a command looks
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Safe,
    Review,
    Caution,
    Dangerous,
}

/// Result of checking one command
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyReport {
    pub command: String,
    pub verdict: Verdict,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl SafetyReport {
    /// Only `Dangerous` commands count as unsafe
    pub fn is_safe(&self) -> bool {
        self.verdict != Verdict::Dangerous
    }

    /// Whether an interactive host should ask before running
    pub fn needs_confirmation(&self) -> bool {
        matches!(self.verdict, Verdict::Caution | Verdict::Dangerous)
    }
}

impl std::fmt::Display for SafetyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Command: {}", self.command)?;
        write!(f, "Status: {}", self.message)?;
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for (i, s) in self.suggestions.iter().enumerate() {
                write!(f, "\n  {}. {}", i + 1, s)?;
            }
        }
        Ok(())
    }
}

const DANGEROUS: &[(&str, &str)] = &[
    ("rm -rf /", "DANGEROUS: Deletes all files on system"),
    ("rm -rf /*", "DANGEROUS: Deletes all files on system"),
    (":(){:|:&};:", "DANGEROUS: Fork bomb - crashes system"),
    ("mkfs", "DANGEROUS: Formats filesystem"),
    ("dd if=/dev/random", "DANGEROUS: Overwrites with random data"),
    ("chmod -r 000 /", "DANGEROUS: Makes all files inaccessible"),
    ("> /dev/sda", "DANGEROUS: Overwrites disk device"),
    ("mv / /dev/null", "DANGEROUS: Moves root to null device"),
];

const WARNINGS: &[(&str, &str)] = &[
    ("rm -rf", "WARNING: Recursive force delete"),
    ("rm -r", "WARNING: Recursive delete"),
    ("shutdown", "WARNING: System shutdown"),
    ("reboot", "WARNING: System reboot"),
    ("poweroff", "WARNING: Power off"),
    ("kill -9", "WARNING: Force kill process"),
    (">", "WARNING: Output redirection"),
];

const SUSPICIOUS: &[(&str, &str)] = &[
    (r"rm.*-.*f", "Force delete without confirmation"),
    (r"rm.*/.*", "Deleting from root directory"),
    (r"chmod.*0+", "Removing all permissions"),
    (r">.*dev", "Redirecting to device files"),
];

struct SuspiciousPattern {
    regex: Regex,
    description: &'static str,
}

/// Compiled classifier
pub struct SafetyChecker {
    suspicious: Vec<SuspiciousPattern>,
}

impl Default for SafetyChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl SafetyChecker {
    pub fn new() -> Self {
        let suspicious = SUSPICIOUS
            .iter()
            .map(|(pattern, description)| SuspiciousPattern {
                regex: Regex::new(pattern).expect("valid regex"),
                description: *description,
            })
            .collect();
        Self { suspicious }
    }

    pub fn check(&self, command: &str) -> SafetyReport {
        let lower = command.trim().to_lowercase();
        let report = |verdict: Verdict, message: String| SafetyReport {
            command: command.to_string(),
            verdict,
            message,
            suggestions: if verdict == Verdict::Safe {
                vec![]
            } else {
                suggestions_for(&lower)
            },
        };

        if let Some((_, desc)) = DANGEROUS.iter().find(|(p, _)| lower.contains(p)) {
            return report(Verdict::Dangerous, desc.to_string());
        }

        if let Some((_, desc)) = WARNINGS.iter().find(|(p, _)| lower.contains(p)) {
            return report(Verdict::Caution, format!("CAUTION: {}", desc));
        }

        if let Some(p) = self.suspicious.iter().find(|p| p.regex.is_match(&lower)) {
            return report(Verdict::Review, format!("REVIEW: {}", p.description));
        }

        report(Verdict::Safe, "SAFE: Command appears safe".to_string())
    }
}

/// Check a command with the shared classifier
pub fn check(command: &str) -> SafetyReport {
    static CHECKER: OnceLock<SafetyChecker> = OnceLock::new();
    CHECKER.get_or_init(SafetyChecker::new).check(command)
}

fn suggestions_for(lower: &str) -> Vec<String> {
    let mut suggestions = Vec::new();

    if lower.contains("rm ") && !lower.contains("-i") {
        suggestions.push("Add '-i' for interactive confirmation before deleting".to_string());
    }
    if lower.contains("rm ") && !["./", "~/", "/home/"].iter().any(|p| lower.contains(p)) {
        suggestions.push("Specify full path to avoid accidental deletion".to_string());
    }
    if lower.contains('>') && ![".txt", ".log", ".json"].iter().any(|p| lower.contains(p)) {
        suggestions.push("Consider using file extension to avoid overwriting devices".to_string());
    }
    if lower.contains("chmod") && lower.contains("777") {
        suggestions.push("Use more restrictive permissions (e.g., 755 instead of 777)".to_string());
    }

    if suggestions.is_empty() {
        suggestions.push("Double-check the command before executing".to_string());
        suggestions.push("Use '--dry-run' option if available".to_string());
        suggestions.push("Test in a safe environment first".to_string());
    }
    suggestions
}
