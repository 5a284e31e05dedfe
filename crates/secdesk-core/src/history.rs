//! Shared search-history log
//!
//! A flat JSON-array file of recent searches, shown as the "community
//! search history" in the front end. Appends are best-effort: the file is
//! loaded, the new entry pushed, the array truncated to the newest
//! `max_entries`, and the whole array rewritten. There is no cross-process
//! locking; concurrent writers can race. That limitation is accepted for
//! the single-session deployment model this serves.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::agents::AgentKind;

/// Default cap on retained entries
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// One logged search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRecord {
    pub id: String,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub agent: AgentKind,
    /// Knowledge-base selection made in the UI, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kb_choice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl SearchRecord {
    pub fn new(query: impl Into<String>, agent: AgentKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            timestamp: Utc::now(),
            agent,
            kb_choice: None,
            ip: None,
            location: None,
            user_agent: None,
        }
    }

    pub fn with_kb_choice(mut self, kb_choice: impl Into<String>) -> Self {
        self.kb_choice = Some(kb_choice.into());
        self
    }

    pub fn with_location(mut self, ip: impl Into<String>, location: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self.location = Some(location.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Capped JSON-array log bound to a file path
#[derive(Debug, Clone)]
pub struct SearchLog {
    path: PathBuf,
    max_entries: usize,
}

impl SearchLog {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all entries, oldest first. A missing file is an empty log; an
    /// unreadable or corrupt file is logged and treated as empty rather
    /// than failing the caller.
    pub fn load(&self) -> Vec<SearchRecord> {
        if !self.path.exists() {
            return Vec::new();
        }
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                warn!("Failed to read search history at {}: {}", self.path.display(), err);
                return Vec::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Search history at {} is corrupt: {}", self.path.display(), err);
                Vec::new()
            }
        }
    }

    /// Append one entry, dropping the oldest entries beyond the cap.
    /// A repeat of the immediately preceding query is skipped.
    pub fn append(&self, record: SearchRecord) -> Result<()> {
        let mut entries = self.load();

        if entries.last().is_some_and(|last| last.query == record.query) {
            debug!("Skipping duplicate consecutive search: {}", record.query);
            return Ok(());
        }

        entries.push(record);
        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(..excess);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create history directory {}", parent.display())
            })?;
        }

        let json = serde_json::to_string(&entries).context("Failed to serialize search history")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write search history to {}", self.path.display()))
    }

    /// The newest `n` entries, newest first
    pub fn recent(&self, n: usize) -> Vec<SearchRecord> {
        let mut entries = self.load();
        entries.reverse();
        entries.truncate(n);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_in(dir: &tempfile::TempDir, max: usize) -> SearchLog {
        SearchLog::new(dir.path().join("history.json"), max)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(log_in(&dir, 10).load().is_empty());
    }

    #[test]
    fn test_append_and_reload_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = log_in(&dir, 10);

        let record = SearchRecord::new("What is a firewall?", AgentKind::Cyber)
            .with_location("203.0.113.7", "Portland, Oregon, United States")
            .with_user_agent("secdesk-cli/0.1.0");
        log.append(record).unwrap();

        let entries = log.load();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.query, "What is a firewall?");
        assert_eq!(entry.agent, AgentKind::Cyber);
        assert_eq!(entry.ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(entry.user_agent.as_deref(), Some("secdesk-cli/0.1.0"));
        assert!(!entry.id.is_empty());
    }

    #[test]
    fn test_most_recent_entry_is_last_submitted() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = log_in(&dir, 10);
        log.append(SearchRecord::new("first", AgentKind::Grc)).unwrap();
        log.append(SearchRecord::new("second", AgentKind::Cyber)).unwrap();

        let entries = log.load();
        assert_eq!(entries.last().unwrap().query, "second");
        assert_eq!(log.recent(1)[0].query, "second");
    }

    #[test]
    fn test_cap_drops_oldest() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = log_in(&dir, 3);
        for i in 0..5 {
            log.append(SearchRecord::new(format!("query {i}"), AgentKind::Grc))
                .unwrap();
        }

        let entries = log.load();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].query, "query 2");
        assert_eq!(entries[2].query, "query 4");
    }

    #[test]
    fn test_consecutive_duplicate_skipped() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = log_in(&dir, 10);
        log.append(SearchRecord::new("same", AgentKind::Grc)).unwrap();
        log.append(SearchRecord::new("same", AgentKind::Grc)).unwrap();
        log.append(SearchRecord::new("different", AgentKind::Grc)).unwrap();
        log.append(SearchRecord::new("same", AgentKind::Grc)).unwrap();

        let queries: Vec<String> = log.load().into_iter().map(|e| e.query).collect();
        assert_eq!(queries, vec!["same", "different", "same"]);
    }

    #[test]
    fn test_corrupt_file_treated_as_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = log_in(&dir, 10);
        std::fs::write(log.path(), "not json at all").unwrap();
        assert!(log.load().is_empty());

        // And an append recovers the file
        log.append(SearchRecord::new("fresh start", AgentKind::Grc)).unwrap();
        assert_eq!(log.load().len(), 1);
    }

    #[test]
    fn test_optional_fields_omitted_from_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = log_in(&dir, 10);
        log.append(SearchRecord::new("bare", AgentKind::Grc)).unwrap();

        let raw = std::fs::read_to_string(log.path()).unwrap();
        assert!(!raw.contains("kb_choice"));
        assert!(!raw.contains("user_agent"));
    }

    #[test]
    fn test_append_creates_parent_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = SearchLog::new(dir.path().join("nested/deeper/history.json"), 10);
        log.append(SearchRecord::new("hello", AgentKind::Grc)).unwrap();
        assert_eq!(log.load().len(), 1);
    }
}
