//! Configuration
//!
//! Loaded from `$AISH_CONFIG` or `~/.aish/config.yaml`. Every field has a
//! default and a missing file is not an error.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::history_log::{default_history_path, DEFAULT_LIMIT};
use crate::resolver::ResolveOptions;
use crate::similarity::DEFAULT_CUTOFF;

pub const CONFIG_ENV: &str = "AISH_CONFIG";

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string()))
}

/// `$AISH_CONFIG`, else `~/.aish/config.yaml`
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".aish").join("config.yaml"))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AishConfig {
    /// Pattern table override (JSON or YAML)
    pub patterns_path: Option<PathBuf>,
    /// Command table override (JSON or YAML)
    pub commands_path: Option<PathBuf>,
    pub history_path: PathBuf,
    pub history_limit: usize,
    pub fuzzy_cutoff: f64,
    pub shell_passthrough: bool,
    pub exec_timeout_ms: u64,
    /// Ask before running commands flagged by the safety checker
    pub confirm_dangerous: bool,
    /// Overrides the detected OS id
    pub os: Option<String>,
}

impl Default for AishConfig {
    fn default() -> Self {
        Self {
            patterns_path: None,
            commands_path: None,
            history_path: default_history_path(),
            history_limit: DEFAULT_LIMIT,
            fuzzy_cutoff: DEFAULT_CUTOFF,
            shell_passthrough: true,
            exec_timeout_ms: 60_000,
            confirm_dangerous: true,
            os: None,
        }
    }
}

impl AishConfig {
    /// Load from `path`, or the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut config: Self = serde_yaml::from_str(content)?;
        config.fuzzy_cutoff = config.fuzzy_cutoff.clamp(0.0, 1.0);
        Ok(config)
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            fuzzy_cutoff: self.fuzzy_cutoff,
            shell_passthrough: self.shell_passthrough,
        }
    }
}
