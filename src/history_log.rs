//! historyLog - persisted command history
//! Stores to: ~/.aish/history.json (a JSON array, oldest first)
//!
//! Older files held bare strings or `{time, entry}` objects; both are read
//! and rewritten in the current shape on the next append.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

/// Longest output prefix kept per record
pub const SNIPPET_CHARS: usize = 200;

pub const DEFAULT_LIMIT: usize = 1000;

/// Default location of the history file
pub fn default_history_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".aish").join("history.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub time: DateTime<Utc>,
    pub command: String,
    #[serde(default)]
    pub exit_code: i32,
    #[serde(default)]
    pub output_snippet: String,
    #[serde(default)]
    pub session: Option<String>,
}

impl HistoryRecord {
    pub fn new(command: impl Into<String>, exit_code: i32, output: &str, session: Option<String>) -> Self {
        Self {
            time: Utc::now(),
            command: command.into(),
            exit_code,
            output_snippet: snippet(output),
            session,
        }
    }
}

/// Any record shape found on disk
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Current(HistoryRecord),
    Timed { time: String, entry: String },
    Bare(String),
}

impl From<StoredRecord> for HistoryRecord {
    fn from(stored: StoredRecord) -> Self {
        match stored {
            StoredRecord::Current(record) => record,
            StoredRecord::Timed { time, entry } => HistoryRecord {
                time: parse_legacy_time(&time),
                command: entry,
                exit_code: 0,
                output_snippet: String::new(),
                session: None,
            },
            StoredRecord::Bare(command) => HistoryRecord {
                time: DateTime::<Utc>::default(),
                command,
                exit_code: 0,
                output_snippet: String::new(),
                session: None,
            },
        }
    }
}

fn parse_legacy_time(raw: &str) -> DateTime<Utc> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return t.with_timezone(&Utc);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

fn snippet(output: &str) -> String {
    output.trim().chars().take(SNIPPET_CHARS).collect()
}

/// Bounded history file with serialized writers
pub struct HistoryLog {
    path: PathBuf,
    limit: usize,
    lock: Mutex<()>,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit: limit.max(1),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Read all records, oldest first; a missing file is an empty history
    async fn load(&self) -> Result<Vec<HistoryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .context("Failed to read history file")?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let stored: Vec<StoredRecord> =
            serde_json::from_str(&content).context("Failed to parse history file")?;
        Ok(stored.into_iter().map(HistoryRecord::from).collect())
    }

    async fn save(&self, records: &[HistoryRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create history directory")?;
        }

        let json = serde_json::to_string_pretty(records)
            .context("Failed to serialize history")?;
        fs::write(&self.path, json)
            .await
            .context("Failed to write history file")?;
        Ok(())
    }

    /// Append a record, dropping the oldest beyond the limit
    pub async fn append(&self, record: HistoryRecord) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await?;
        records.push(record);
        if records.len() > self.limit {
            let excess = records.len() - self.limit;
            records.drain(..excess);
        }

        self.save(&records).await
    }

    /// Up to `limit` records, newest first
    pub async fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        let _guard = self.lock.lock().await;
        let records = self.load().await?;
        Ok(records.into_iter().rev().take(limit).collect())
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.save(&[]).await
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(default_history_path(), DEFAULT_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn log_in(dir: &TempDir, limit: usize) -> HistoryLog {
        HistoryLog::new(dir.path().join("nested").join("history.json"), limit)
    }

    #[tokio::test]
    async fn test_append_and_recent() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, 10);

        log.append(HistoryRecord::new("ls", 0, "a.txt\n", Some("s1".into())))
            .await
            .unwrap();
        log.append(HistoryRecord::new("false", 1, "", None)).await.unwrap();

        let recent = log.recent(10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].command, "false");
        assert_eq!(recent[0].exit_code, 1);
        assert_eq!(recent[1].output_snippet, "a.txt");
        assert_eq!(recent[1].session.as_deref(), Some("s1"));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, 10);
        assert!(log.recent(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_limit_drops_oldest() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, 3);
        for i in 0..5 {
            log.append(HistoryRecord::new(format!("cmd {}", i), 0, "", None))
                .await
                .unwrap();
        }

        let recent = log.recent(10).await.unwrap();
        let commands: Vec<&str> = recent.iter().map(|r| r.command.as_str()).collect();
        assert_eq!(commands, vec!["cmd 4", "cmd 3", "cmd 2"]);
    }

    #[tokio::test]
    async fn test_snippet_is_capped() {
        let dir = TempDir::new().unwrap();
        let log = log_in(&dir, 10);
        let output = "x".repeat(500);
        log.append(HistoryRecord::new("yes", 0, &output, None)).await.unwrap();

        let recent = log.recent(1).await.unwrap();
        assert_eq!(recent[0].output_snippet.chars().count(), SNIPPET_CHARS);
    }

    #[tokio::test]
    async fn test_legacy_records_are_migrated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(
            &path,
            r#"["ls -la", {"time": "2024-03-01T10:20:30.123456", "entry": "pwd"}]"#,
        )
        .unwrap();

        let log = HistoryLog::new(&path, 10);
        let recent = log.recent(10).await.unwrap();
        assert_eq!(recent[0].command, "pwd");
        assert_eq!(recent[0].time.format("%Y-%m-%d").to_string(), "2024-03-01");
        assert_eq!(recent[1].command, "ls -la");

        log.append(HistoryRecord::new("whoami", 0, "me", None)).await.unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["command"], "ls -la");
        assert_eq!(raw[1]["command"], "pwd");
        assert_eq!(raw[2]["output_snippet"], "me");
    }

    #[tokio::test]
    async fn test_concurrent_appends() {
        let dir = TempDir::new().unwrap();
        let log = std::sync::Arc::new(log_in(&dir, 100));

        let tasks: Vec<_> = (0..10)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move {
                    log.append(HistoryRecord::new(format!("c{}", i), 0, "", None))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(log.recent(100).await.unwrap().len(), 10);
    }
}
