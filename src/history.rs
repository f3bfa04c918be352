//! Bounded JSON log of past uploads, newest first.
//!
//! The whole file is rewritten on every push; at 50 entries that is
//! cheaper than it sounds and keeps the format trivially inspectable.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::errors::Result;
use crate::services::{Service, UploadOutcome};
use crate::upload::UploadJob;

/// Oldest entries are dropped past this count.
pub const HISTORY_LIMIT: usize = 50;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub file_name: String,
    pub file_size: u64,
    pub service: Service,
    pub file_id: String,
    pub link: String,
    /// RFC 3339 upload timestamp.
    pub uploaded_at: String,
}

impl HistoryRecord {
    pub fn new(job: &UploadJob, service: Service, outcome: &UploadOutcome) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            file_name: job.file_name.clone(),
            file_size: job.file_size,
            service,
            file_id: outcome.file_id.clone(),
            link: outcome.link.clone(),
            uploaded_at: Utc::now().to_rfc3339(),
        }
    }
}

pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// History lives under the platform data dir, e.g.
    /// `~/.local/share/updrop/history.json` on Linux.
    pub fn open_default() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "updrop")
            .context("could not determine a data directory for this platform")?;
        Ok(Self {
            path: dirs.data_dir().join("history.json"),
        })
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    /// Missing or unreadable history is just empty. Losing the log is
    /// not worth failing an upload over.
    pub fn load(&self) -> Vec<HistoryRecord> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|data| serde_json::from_str(&data).ok())
            .unwrap_or_default()
    }

    /// Insert at the front and trim to [`HISTORY_LIMIT`].
    pub fn push(&self, record: HistoryRecord) -> Result<()> {
        let mut records = self.load();
        records.insert(0, record);
        records.truncate(HISTORY_LIMIT);
        self.save(&records)
    }

    pub fn clear(&self) -> Result<()> {
        self.save(&[])
    }

    fn save(&self, records: &[HistoryRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(id: &str) -> HistoryRecord {
        HistoryRecord {
            id: id.to_string(),
            file_name: format!("{id}.bin"),
            file_size: 1024,
            service: Service::Gofile,
            file_id: format!("remote-{id}"),
            link: format!("https://gofile.io/d/{id}"),
            uploaded_at: "2026-08-30T08:30:00+00:00".to_string(),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::at(dir.path().join("history.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "[{broken").unwrap();

        let store = HistoryStore::at(path);
        assert!(store.load().is_empty());
    }

    #[test]
    fn push_puts_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::at(dir.path().join("history.json"));

        store.push(sample_record("old")).unwrap();
        store.push(sample_record("new")).unwrap();

        let records = store.load();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "new");
        assert_eq!(records[1].id, "old");
    }

    #[test]
    fn push_trims_to_limit() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::at(dir.path().join("history.json"));

        for i in 0..(HISTORY_LIMIT + 10) {
            store.push(sample_record(&format!("r{i}"))).unwrap();
        }

        let records = store.load();
        assert_eq!(records.len(), HISTORY_LIMIT);
        // newest survives, the first ten pushed are gone
        assert_eq!(records[0].id, format!("r{}", HISTORY_LIMIT + 9));
        assert_eq!(records.last().unwrap().id, "r10");
    }

    #[test]
    fn clear_empties_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::at(dir.path().join("history.json"));

        store.push(sample_record("a")).unwrap();
        store.clear().unwrap();
        assert!(store.load().is_empty());
    }

    #[test]
    fn record_roundtrips_through_json() {
        let record = sample_record("abc");
        let json = serde_json::to_string(&record).unwrap();
        let parsed: HistoryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, record.id);
        assert_eq!(parsed.service, Service::Gofile);
        assert_eq!(parsed.link, record.link);
    }
}
