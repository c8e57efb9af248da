//! Session context store
//!
//! Append-only history of executed commands plus the last-seen value of each
//! entity class. The reference resolver reads it to expand "again", "them",
//! "2 commands ago" and friends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Fixed set of tracked entity classes
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityClass {
    #[serde(rename = "last_files")]
    Files,
    #[serde(rename = "last_dir")]
    Dir,
    #[serde(rename = "last_host")]
    Host,
    #[serde(rename = "last_process")]
    Process,
    #[serde(rename = "last_output")]
    Output,
}

impl EntityClass {
    pub const ALL: [EntityClass; 5] = [
        EntityClass::Files,
        EntityClass::Dir,
        EntityClass::Host,
        EntityClass::Process,
        EntityClass::Output,
    ];

    /// Map key used in serialized state
    pub fn key(&self) -> &'static str {
        match self {
            EntityClass::Files => "last_files",
            EntityClass::Dir => "last_dir",
            EntityClass::Host => "last_host",
            EntityClass::Process => "last_process",
            EntityClass::Output => "last_output",
        }
    }

    /// Accepts both "files" and "last_files"
    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim().to_lowercase();
        let bare = key.strip_prefix("last_").unwrap_or(&key);
        match bare {
            "files" => Some(EntityClass::Files),
            "dir" => Some(EntityClass::Dir),
            "host" => Some(EntityClass::Host),
            "process" => Some(EntityClass::Process),
            "output" => Some(EntityClass::Output),
            _ => None,
        }
    }
}

/// An entity value: a single string or a list (file names)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityValue {
    Text(String),
    List(Vec<String>),
}

impl EntityValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EntityValue::Text(s) => Some(s),
            EntityValue::List(_) => None,
        }
    }

    /// Lists as-is, a single string as a one-element list
    pub fn as_list(&self) -> Vec<String> {
        match self {
            EntityValue::Text(s) => vec![s.clone()],
            EntityValue::List(items) => items.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            EntityValue::Text(s) => s.trim().is_empty(),
            EntityValue::List(items) => items.is_empty(),
        }
    }
}

impl From<&str> for EntityValue {
    fn from(s: &str) -> Self {
        EntityValue::Text(s.to_string())
    }
}

impl From<String> for EntityValue {
    fn from(s: String) -> Self {
        EntityValue::Text(s)
    }
}

impl From<Vec<String>> for EntityValue {
    fn from(items: Vec<String>) -> Self {
        EntityValue::List(items)
    }
}

pub type Entities = BTreeMap<EntityClass, EntityValue>;

/// One executed command; never modified after it is appended
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub command: String,
    pub result: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub entities: Entities,
    pub exit_code: i32,
    pub timestamp: DateTime<Utc>,
}

/// Per-session history and entity memory
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContextStore {
    history: Vec<HistoryEntry>,
    entities: Entities,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an executed command.
    ///
    /// Provided entities overwrite the previous value of their class; a
    /// non-empty `result` becomes `last_output`.
    pub fn append(
        &mut self,
        command: impl Into<String>,
        result: Option<String>,
        kind: Option<String>,
        entities: Entities,
        exit_code: i32,
    ) -> &HistoryEntry {
        for (class, value) in &entities {
            if !value.is_empty() {
                self.entities.insert(*class, value.clone());
            }
        }

        if let Some(output) = result.as_deref().filter(|r| !r.trim().is_empty()) {
            self.entities
                .insert(EntityClass::Output, EntityValue::Text(output.to_string()));
        }

        self.history.push(HistoryEntry {
            command: command.into(),
            result,
            kind,
            entities,
            exit_code,
            timestamp: Utc::now(),
        });

        let idx = self.history.len() - 1;
        &self.history[idx]
    }

    /// Entry `n` positions from the end (1 = most recent)
    pub fn last_entry(&self, n: usize) -> Option<&HistoryEntry> {
        if n == 0 || n > self.history.len() {
            return None;
        }
        self.history.get(self.history.len() - n)
    }

    /// Command string `n` positions from the end
    pub fn last_command(&self, n: usize) -> Option<&str> {
        self.last_entry(n).map(|e| e.command.as_str())
    }

    /// Most recent entry with the given type
    pub fn last_of_type(&self, kind: &str) -> Option<&HistoryEntry> {
        self.history
            .iter()
            .rev()
            .find(|e| e.kind.as_deref() == Some(kind))
    }

    /// Last `limit` entries, oldest first
    pub fn recent(&self, limit: usize) -> &[HistoryEntry] {
        let start = self.history.len().saturating_sub(limit);
        &self.history[start..]
    }

    pub fn entity(&self, class: EntityClass) -> Option<&EntityValue> {
        self.entities.get(&class)
    }

    /// Text value of an entity class, if set and non-empty
    pub fn entity_text(&self, class: EntityClass) -> Option<&str> {
        self.entity(class)
            .and_then(EntityValue::as_text)
            .filter(|s| !s.trim().is_empty())
    }

    /// List value of an entity class (empty when unset)
    pub fn entity_list(&self, class: EntityClass) -> Vec<String> {
        self.entity(class).map(EntityValue::as_list).unwrap_or_default()
    }

    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

/// Context store shared between sessions.
///
/// `append` runs under one lock so ordering and the entity merge stay
/// atomic; readers work on snapshots.
#[derive(Clone, Debug, Default)]
pub struct SharedContext {
    inner: Arc<Mutex<ContextStore>>,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(
        &self,
        command: impl Into<String>,
        result: Option<String>,
        kind: Option<String>,
        entities: Entities,
        exit_code: i32,
    ) -> HistoryEntry {
        let mut store = self.lock();
        store
            .append(command, result, kind, entities, exit_code)
            .clone()
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ContextStore {
        self.lock().clone()
    }

    /// Read the store under the lock
    pub fn read<R>(&self, f: impl FnOnce(&ContextStore) -> R) -> R {
        f(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, ContextStore> {
        // a panicked writer cannot leave a half-appended entry behind
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
